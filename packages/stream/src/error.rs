//! Error types for the stream layer.

use thiserror::Error;

/// A terminal failure travelling down a stream.
///
/// Once a source fails, every stream derived from it fails with the same
/// error. Nothing in this crate retries; retrying is up to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream failed: {message}")]
pub struct StreamError {
    message: String,
}

impl StreamError {
    /// Create a stream error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors from binding a [`ProxyStream`](crate::ProxyStream) to its source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The proxy already has a source.
    #[error("proxy stream is already bound to a source")]
    AlreadyBound,
}
