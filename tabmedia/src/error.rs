//! Types d'erreurs pour tabmedia

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Not a data URI")]
    NotDataUri,

    #[error("Malformed data URI: {0}")]
    MalformedDataUri(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;
