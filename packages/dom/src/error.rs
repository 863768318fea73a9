//! Error types for the DOM driver.

use cycle_run::RunError;
use cycle_stream::StreamError;
use thiserror::Error;

/// Errors from the document, the selector index and the DOM driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The driver has been disposed.
    #[error("DOM driver has been disposed")]
    DriverDisposed,

    /// A selector could not be parsed.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The container selector matched nothing.
    #[error("no container element matches '{selector}'")]
    ContainerNotFound { selector: String },

    /// A rendered tag is neither a known HTML element nor a registered
    /// custom element.
    #[error("unknown element <{tag}>")]
    UnknownCustomElement { tag: String },

    /// A node handle no longer refers to a live node.
    #[error("node has been removed from its document")]
    DetachedNode,

    /// A node cannot be inserted at the requested place.
    #[error("cannot insert a node into itself or a node of another document")]
    HierarchyRequest,

    /// A patch addressed a node that is not in the container.
    #[error("patch target {path:?} does not exist")]
    PatchTarget { path: Vec<usize> },

    /// A custom element's component failed.
    #[error("component <{tag}> failed: {message}")]
    Component { tag: String, message: String },

    /// The request stream failed.
    #[error("request stream failed: {0}")]
    Stream(#[from] StreamError),
}

impl From<DomError> for RunError {
    fn from(error: DomError) -> Self {
        RunError::driver(error)
    }
}
