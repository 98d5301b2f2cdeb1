//! Récupération des octets d'un payload non base64

use async_trait::async_trait;
use bytes::Bytes;

use crate::data_uri::DataUri;
use crate::resolver::Blob;
use crate::{MediaError, Result};

/// Source des octets d'un payload que le resolver ne sait pas décoder seul.
///
/// Le resolver décode lui-même les data URIs base64 ; tout autre payload
/// `data:` passe par ce trait.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch(&self, payload: &str) -> Result<Blob>;
}

/// Décode les data URIs percent-encodées (`data:text/plain,Hello%20World`)
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineFetcher;

#[async_trait]
impl PayloadFetcher for InlineFetcher {
    async fn fetch(&self, payload: &str) -> Result<Blob> {
        if !DataUri::is_data_uri(payload) {
            let scheme = payload.split(':').next().unwrap_or_default();
            return Err(MediaError::UnsupportedScheme(scheme.to_string()));
        }
        let uri = DataUri::parse(payload)?;
        let bytes = if uri.base64 {
            uri.decode_base64()?
        } else {
            urlencoding::decode_binary(uri.data.as_bytes()).into_owned()
        };
        Ok(Blob {
            mime: uri.mime,
            bytes: Bytes::from(bytes),
        })
    }
}
