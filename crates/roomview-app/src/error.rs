//! Error types for the room view coordinator.
//!
//! [`ServiceError`] is what the remote messaging service reports for alias
//! lookups and join requests. It is stored in the view state, so it must be
//! cheap to clone and comparable. [`RuntimeError`] covers misuse of the
//! dispatch bus itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP status the homeserver uses for a gateway timeout.
pub const GATEWAY_TIMEOUT: u16 = 504;

/// HTTP status for an unknown resource.
pub const NOT_FOUND: u16 = 404;

/// Error code returned when the homeserver cannot handle the room version.
pub const INCOMPATIBLE_ROOM_VERSION: &str = "M_INCOMPATIBLE_ROOM_VERSION";

/// Failure reported by the remote messaging service.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    /// The request never reached the homeserver.
    #[error("connection error: {message}")]
    Connection {
        /// Transport-level description.
        message: String,
    },

    /// The homeserver answered with an error response.
    #[error("HTTP {status}{}", describe(.errcode.as_deref(), .message.as_deref()))]
    Http {
        /// HTTP status code.
        status: u16,
        /// Protocol error code (e.g. `M_FORBIDDEN`).
        errcode: Option<String>,
        /// Human-readable error text from the server.
        message: Option<String>,
    },

    /// The request could not be built locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn describe(errcode: Option<&str>, message: Option<&str>) -> String {
    match (errcode, message) {
        (Some(code), Some(text)) => format!(" {code}: {text}"),
        (Some(code), None) => format!(" {code}"),
        (None, Some(text)) => format!(": {text}"),
        (None, None) => String::new(),
    }
}

impl ServiceError {
    /// Build a connection-level failure.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Build an HTTP failure with only a status code.
    pub fn http(status: u16) -> Self {
        Self::Http { status, errcode: None, message: None }
    }

    /// Build an HTTP failure carrying a protocol error code and message.
    pub fn matrix(status: u16, errcode: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http { status, errcode: Some(errcode.into()), message: Some(message.into()) }
    }

    /// HTTP status code, if the homeserver answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Connection { .. } | Self::InvalidRequest(_) => None,
        }
    }

    /// Protocol error code, if the homeserver supplied one.
    pub fn errcode(&self) -> Option<&str> {
        match self {
            Self::Http { errcode, .. } => errcode.as_deref(),
            Self::Connection { .. } | Self::InvalidRequest(_) => None,
        }
    }

    /// Returns true if this error is transient and the request may succeed on
    /// retry.
    ///
    /// Only gateway timeouts qualify. Every other failure, including other 5xx
    /// responses and connection errors, is terminal for a join attempt.
    pub fn is_transient(&self) -> bool {
        self.http_status() == Some(GATEWAY_TIMEOUT)
    }

    /// The error text as reported, falling back to the rendered error.
    pub fn raw_message(&self) -> String {
        match self {
            Self::Connection { message } => message.clone(),
            Self::Http { message: Some(message), .. } => message.clone(),
            Self::Http { message: None, .. } | Self::InvalidRequest(_) => self.to_string(),
        }
    }
}

/// Errors surfaced by the dispatch bus and runtime loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The runtime owning the bus inbox has shut down.
    #[error("dispatch bus closed")]
    BusClosed,
}
