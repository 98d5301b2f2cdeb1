//! Types d'erreurs des flux tiers

/// Alias de Result pour les opérations sur les flux
pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Échec de la requête HTTP
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Échec du parsing JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Échec du stockage du cache
    #[error("Store error: {0}")]
    Store(#[from] tabstore::StoreError),

    /// Aucun endpoint configuré pour ce flux
    #[error("No endpoint configured for {0} feed")]
    NotConfigured(&'static str),
}
