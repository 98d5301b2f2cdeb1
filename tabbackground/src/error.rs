//! Types d'erreurs pour tabbackground

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Empty media payload")]
    EmptyPayload,

    #[error("Ephemeral handle has no known durable payload: {0}")]
    UnknownHandle(String),
}

pub type Result<T> = std::result::Result<T, Error>;
