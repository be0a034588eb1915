use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    /// Malformed filter input or event payload. Reported to the caller, never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The event store could not be reached or a query failed.
    #[error("Data access error: {message}")]
    DataAccess { message: String },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EventsError {
    pub fn validation(message: impl Into<String>) -> Self {
        EventsError::Validation(message.into())
    }

    pub fn data_access(message: impl Into<String>) -> Self {
        EventsError::DataAccess {
            message: message.into(),
        }
    }

    /// Reads are idempotent, so only store failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EventsError::DataAccess { .. })
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EventsError::Validation(_) | EventsError::Unauthorized(_) | EventsError::NotFound(_)
        )
    }
}

impl From<rusqlite::Error> for EventsError {
    fn from(e: rusqlite::Error) -> Self {
        EventsError::DataAccess {
            message: format!("SQLite error: {e}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, EventsError>;
