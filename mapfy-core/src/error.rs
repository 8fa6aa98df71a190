//! Error taxonomy for editor operations.
//!
//! Components catch failures at their own boundary and translate them into
//! one of these variants before surfacing; no raw transport or parser error
//! crosses a component boundary unconverted.

use thiserror::Error;

/// Result type for editor operations.
pub type MapResult<T> = Result<T, MapError>;

/// Errors surfaced by the editor core.
#[derive(Debug, Error)]
pub enum MapError {
    /// Container missing or engine construction failed. Fatal to the editor
    /// session; surfaced with a reload affordance.
    #[error("Map initialization failed: {0}")]
    Initialization(String),

    /// The overlay control could not attach. Recoverable; the editor stays
    /// in a viewing-only mode until a retry succeeds.
    #[error("Draw tools could not attach: {0}")]
    Attachment(String),

    /// Local input validation failed; no network call was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A CRUD or auth call failed.
    #[error("Network error: {message}")]
    Network {
        /// HTTP status, when one was received.
        status: Option<u16>,
        /// Human-readable cause from the transport or the server.
        message: String,
    },

    /// The server rejected the bearer credential; the user should
    /// re-authenticate. In-memory editor state is untouched.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// A file could not be parsed or serialized.
    #[error("Format error: {0}")]
    Format(String),

    /// An operation of the same kind is already in flight.
    #[error("Operation already in progress: {0}")]
    Busy(&'static str),
}

impl MapError {
    /// Build a network error without an HTTP status (transport failure).
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Build a network error carrying the server's HTTP status.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Failure reported by an external engine (map or draw overlay).
///
/// Engines are outside this codebase; their failures carry only a message
/// and are translated into [`MapError`] at the controller boundary.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    /// Human-readable cause from the engine.
    pub message: String,
}

impl EngineError {
    /// Create an engine error from any displayable cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
