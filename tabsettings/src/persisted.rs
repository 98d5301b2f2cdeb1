//! État persisté générique : défauts, fusion validée, mutation puis sauvegarde

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tabstore::{Collection, KvStore};

/// Valeur stockée sous une clé fixe d'une collection du store.
pub trait Persisted: Clone + Serialize + Send + Sync + 'static {
    const COLLECTION: Collection;
    const KEY: &'static str;

    /// Valeurs codées en dur, disponibles sans accès au store.
    fn defaults() -> Self;

    /// Fusionne une valeur persistée sur les défauts, champ par champ.
    fn merge_persisted(raw: &Value) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
}

/// Origine de la valeur effective après [`PersistedState::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loaded {
    /// Une valeur persistée a été trouvée et fusionnée sur les défauts.
    Persisted,
    /// Rien de persisté : valeurs par défaut.
    Defaults,
    /// Lecture du store en échec : valeurs par défaut en mémoire, le contenu
    /// du store est peut-être encore valide.
    Failed,
}

struct Inner<T> {
    value: T,
    phase: Phase,
    /// Modifié avant la fin du chargement
    dirty: bool,
}

/// Cache en écriture différée d'une valeur [`Persisted`].
///
/// - L'état mémoire est initialisé de façon synchrone avec les défauts.
/// - Chaque mutation s'applique d'abord en mémoire, puis est écrite dans le
///   store. Un échec d'écriture est journalisé et n'annule pas la mutation.
/// - Les écritures sont sérialisées et écrivent toujours la dernière valeur
///   en mémoire : une écriture ancienne ne peut pas passer après une récente.
pub struct PersistedState<T: Persisted> {
    writer: WriteBehind,
    inner: RwLock<Inner<T>>,
}

impl<T: Persisted> PersistedState<T> {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            writer: WriteBehind::new(store, T::COLLECTION, T::KEY),
            inner: RwLock::new(Inner {
                value: T::defaults(),
                phase: Phase::Uninitialized,
                dirty: false,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.read().unwrap().phase
    }

    /// Copie de la valeur courante
    pub fn get(&self) -> T {
        self.inner.read().unwrap().value.clone()
    }

    /// Lit le store et fusionne la valeur persistée sur les défauts.
    ///
    /// Atteint toujours `READY`. Si l'état a été modifié pendant le
    /// chargement, la modification la plus récente est conservée et réécrite.
    pub async fn load(&self) -> Loaded {
        self.inner.write().unwrap().phase = Phase::Loading;

        let (merged, loaded) = match self.writer.read().await {
            Ok(Some(raw)) => (T::merge_persisted(&raw), Loaded::Persisted),
            Ok(None) => {
                tracing::debug!(collection = %T::COLLECTION, key = T::KEY, "No persisted value, using defaults");
                (T::defaults(), Loaded::Defaults)
            }
            Err(e) => {
                tracing::warn!(collection = %T::COLLECTION, key = T::KEY, "Failed to read persisted value: {}", e);
                (T::defaults(), Loaded::Failed)
            }
        };

        let keep_local = {
            let mut inner = self.inner.write().unwrap();
            let keep_local = inner.dirty;
            if !keep_local {
                inner.value = merged;
            }
            inner.dirty = false;
            inner.phase = Phase::Ready;
            keep_local
        };

        if keep_local {
            tracing::debug!(collection = %T::COLLECTION, "State changed while loading, keeping local value");
            self.flush_logged().await;
        }

        loaded
    }

    /// Applique `f` en mémoire puis persiste. Retourne la nouvelle valeur.
    pub async fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&mut T),
    {
        let value = {
            let mut inner = self.inner.write().unwrap();
            f(&mut inner.value);
            if inner.phase != Phase::Ready {
                inner.dirty = true;
            }
            inner.value.clone()
        };
        self.flush_logged().await;
        value
    }

    /// Applique `f` en mémoire seulement, sans écriture.
    ///
    /// La prochaine écriture (via [`update`](Self::update) ou
    /// [`flush`](Self::flush)) emportera la modification.
    pub fn update_local<F>(&self, f: F) -> T
    where
        F: FnOnce(&mut T),
    {
        let mut inner = self.inner.write().unwrap();
        f(&mut inner.value);
        if inner.phase != Phase::Ready {
            inner.dirty = true;
        }
        inner.value.clone()
    }

    /// Remplace la valeur puis persiste
    pub async fn replace(&self, value: T) -> T {
        self.update(move |current| *current = value).await
    }

    /// Écrit la valeur courante dans le store
    pub async fn flush(&self) -> tabstore::Result<()> {
        self.writer.write(|| serde_json::to_value(self.get())).await
    }

    async fn flush_logged(&self) {
        self.writer
            .write_logged(|| serde_json::to_value(self.get()))
            .await;
    }
}

/// Écriture sérialisée d'une clé du store.
///
/// La valeur est produite une fois le verrou d'écriture obtenu : chaque
/// écriture porte l'état le plus récent, jamais un instantané périmé.
pub struct WriteBehind {
    store: Arc<dyn KvStore>,
    collection: Collection,
    key: &'static str,
    lock: tokio::sync::Mutex<()>,
}

impl WriteBehind {
    pub fn new(store: Arc<dyn KvStore>, collection: Collection, key: &'static str) -> Self {
        Self {
            store,
            collection,
            key,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub async fn read(&self) -> tabstore::Result<Option<Value>> {
        self.store.get(self.collection, self.key).await
    }

    pub async fn write<F>(&self, latest: F) -> tabstore::Result<()>
    where
        F: FnOnce() -> serde_json::Result<Value>,
    {
        let _guard = self.lock.lock().await;
        let raw = latest()?;
        self.store.set(self.collection, self.key, &raw).await
    }

    /// Comme [`write`](Self::write), l'échec est journalisé.
    pub async fn write_logged<F>(&self, latest: F) -> bool
    where
        F: FnOnce() -> serde_json::Result<Value>,
    {
        match self.write(latest).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    collection = %self.collection,
                    key = self.key,
                    "Failed to persist value, change kept in memory only: {}",
                    e
                );
                false
            }
        }
    }
}

/// Objet JSON d'une valeur persistée, `None` (avec un avertissement) sinon.
pub(crate) fn as_object<'a>(
    raw: &'a Value,
    collection: Collection,
) -> Option<&'a serde_json::Map<String, Value>> {
    match raw {
        Value::Object(map) => Some(map),
        other => {
            tracing::warn!(collection = %collection, value = %other, "Persisted value is not an object, using defaults");
            None
        }
    }
}
