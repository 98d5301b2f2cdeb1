//! Types d'erreurs pour tabstore

/// Erreurs de l'adaptateur de stockage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour tabstore
pub type Result<T> = std::result::Result<T, StoreError>;
