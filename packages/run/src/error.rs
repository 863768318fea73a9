//! Error types for the cycle runtime.

use cycle_stream::{BindError, StreamError};
use thiserror::Error;

/// Errors that can occur while wiring or running an application.
#[derive(Debug, Error)]
pub enum RunError {
    /// The application produced requests for a driver that is not configured.
    #[error("no driver named '{0}'")]
    UnknownDriver(String),

    /// A driver that consumes requests got none from the application.
    #[error("driver '{driver}' needs requests but main returned none for it")]
    MissingRequests { driver: String },

    /// Requests for a driver have the wrong item type.
    #[error("requests for driver '{driver}' are not a Stream<{expected}>")]
    RequestType {
        driver: String,
        expected: &'static str,
    },

    /// A response was read as the wrong type.
    #[error("response of driver '{driver}' is not a {expected}")]
    ResponseType {
        driver: String,
        expected: &'static str,
    },

    /// A proxy response could not be bound.
    #[error("bind error: {0}")]
    Bind(#[from] BindError),

    /// A stream failed while wiring.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// A driver failed to start.
    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RunError {
    /// Wrap a driver-specific error.
    pub fn driver(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        RunError::Driver(Box::new(error))
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RunError>;
