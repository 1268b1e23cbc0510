use thiserror::Error;

use crate::platform::PlatformError;

/// Errors surfaced by the ticket subsystem.
///
/// The first four variants are the rejections a caller can act on; the others wrap
/// failures of the collaborators.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Discord error: {0}")]
    Platform(#[from] PlatformError),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Discord client error: {0}")]
    Client(#[from] serenity::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Error::NotFound(what.into())
    }
    pub fn invalid<S: Into<String>>(why: S) -> Self {
        Error::InvalidInput(why.into())
    }
    /// True when the error means the target does not exist, whichever side noticed it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Platform(PlatformError::NotFound(_)))
    }
}
