//! Cache bidirectionnel payload durable <-> handle éphémère
//!
//! Chaque data URI est décodée au plus une fois par processus. Les deux
//! tables partagent la même allocation du payload (`Arc<str>`) et les
//! octets décodés sont conservés dans un [`Bytes`], clonable sans copie.
//!
//! Les entrées ne sont jamais évincées : un handle reste valide tant que le
//! resolver vit.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::data_uri::DataUri;
use crate::fetch::{InlineFetcher, PayloadFetcher};
use crate::Result;

/// Préfixe de tous les handles éphémères
pub const HANDLE_PREFIX: &str = "blob:tabula/";

/// Indique si `s` est un handle éphémère (et non un payload durable)
pub fn is_handle(s: &str) -> bool {
    s.starts_with("blob:")
}

/// Octets décodés d'un payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: String,
    pub bytes: Bytes,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

struct Registered {
    payload: Arc<str>,
    blob: Blob,
}

#[derive(Default)]
struct HandleCache {
    by_payload: HashMap<Arc<str>, Arc<str>>,
    by_handle: HashMap<Arc<str>, Registered>,
}

pub struct Resolver {
    fetcher: Arc<dyn PayloadFetcher>,
    cache: RwLock<HandleCache>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(InlineFetcher))
    }

    pub fn with_fetcher(fetcher: Arc<dyn PayloadFetcher>) -> Self {
        Self {
            fetcher,
            cache: RwLock::new(HandleCache::default()),
        }
    }

    /// Retourne une URL affichable pour `payload`.
    ///
    /// - les handles et les URLs distantes sont rendus tels quels ;
    /// - une data URI déjà vue renvoie le même handle ;
    /// - en cas d'échec de décodage le payload d'origine est renvoyé.
    pub async fn resolve(&self, payload: &str) -> String {
        if is_handle(payload) || !DataUri::is_data_uri(payload) {
            return payload.to_string();
        }
        if let Some(handle) = self.lookup(payload) {
            return handle;
        }

        match self.decode(payload).await {
            Ok(blob) => self.register(payload, blob),
            Err(e) => {
                warn!(
                    error = %e,
                    payload_len = payload.len(),
                    "Failed to resolve payload, using it as-is"
                );
                payload.to_string()
            }
        }
    }

    /// Retrouve le payload durable derrière un handle.
    ///
    /// `None` si le handle n'a pas été émis par ce resolver.
    pub fn reverse_resolve(&self, handle: &str) -> Option<String> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache
            .by_handle
            .get(handle)
            .map(|r| r.payload.to_string())
    }

    /// Forme durable d'une URL affichée : le payload si c'est un handle
    /// connu, sinon l'URL elle-même.
    pub fn durable(&self, url: &str) -> String {
        if is_handle(url) {
            if let Some(payload) = self.reverse_resolve(url) {
                return payload;
            }
        }
        url.to_string()
    }

    /// Octets servis derrière un handle
    pub fn blob(&self, handle: &str) -> Option<Blob> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.by_handle.get(handle).map(|r| r.blob.clone())
    }

    /// Résout d'avance une liste de payloads. Retourne le nombre de
    /// handles disponibles à l'issue.
    pub async fn prewarm<I, S>(&self, payloads: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ready = 0;
        for payload in payloads {
            let payload = payload.as_ref();
            if !DataUri::is_data_uri(payload) {
                continue;
            }
            if is_handle(&self.resolve(payload).await) {
                ready += 1;
            }
        }
        debug!(ready, "Prewarmed resolver");
        ready
    }

    /// Nombre de payloads enregistrés
    pub fn len(&self) -> usize {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, payload: &str) -> Option<String> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.by_payload.get(payload).map(|h| h.to_string())
    }

    async fn decode(&self, payload: &str) -> Result<Blob> {
        let uri = DataUri::parse(payload)?;
        if uri.base64 {
            let bytes = uri.decode_base64()?;
            Ok(Blob {
                mime: uri.mime,
                bytes: Bytes::from(bytes),
            })
        } else {
            self.fetcher.fetch(payload).await
        }
    }

    fn register(&self, payload: &str, blob: Blob) -> String {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());

        // Une résolution concurrente a pu enregistrer le payload entre-temps
        if let Some(handle) = cache.by_payload.get(payload) {
            return handle.to_string();
        }

        let handle: Arc<str> = format!("{}{}", HANDLE_PREFIX, uuid::Uuid::new_v4()).into();
        let payload: Arc<str> = payload.into();
        debug!(
            handle = %handle,
            mime = %blob.mime,
            size = blob.len(),
            "Registered payload"
        );
        cache.by_payload.insert(payload.clone(), handle.clone());
        cache
            .by_handle
            .insert(handle.clone(), Registered { payload, blob });
        handle.to_string()
    }
}
