use thiserror::Error;

use crate::message::DestinationMessageResponse;

pub type Result<T> = std::result::Result<T, NotificationError>;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Credential resolution failed: {0}")]
    CredentialResolution(String),

    #[error("No transport registered for destination type: {0}")]
    UnsupportedDestination(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Counter store error: {0}")]
    CounterStore(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    /// HTTP-style status for this error when it has to be reported as a delivery result.
    pub fn status_code(&self) -> u16 {
        match self {
            NotificationError::InvalidDestination(_)
            | NotificationError::InvalidMessage(_)
            | NotificationError::Serialization(_) => 400,
            NotificationError::CredentialResolution(_)
            | NotificationError::CounterStore(_)
            | NotificationError::Redis(_) => 503,
            NotificationError::UnsupportedDestination(_)
            | NotificationError::Config(_)
            | NotificationError::Internal(_) => 500,
        }
    }
}

impl From<NotificationError> for DestinationMessageResponse {
    fn from(err: NotificationError) -> Self {
        DestinationMessageResponse::new(err.status_code(), err.to_string())
    }
}
