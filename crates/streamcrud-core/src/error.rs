//! Error types for the mirror core.
//!
//! Sync operations never return these to their callers. They travel inside a
//! [`SyncFailure`](crate::diagnostics::SyncFailure) to the diagnostic sink.
//! Only [`LookupError`] surfaces directly, when routing parameters cannot be
//! turned into an id.

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("remote returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("response body is not JSON: {0}")]
    Body(String),
}

/// A payload could not be turned into an item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload did not have the expected shape.
    #[error("unexpected payload shape: {0}")]
    Shape(String),

    /// The payload matched the shape but a field was invalid.
    #[error("invalid payload: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Invalid(e.to_string())
    }
}

/// Underlying cause of a failed sync operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The remote call failed on every attempt.
    #[error("transport failed after {attempts} attempts: {source}")]
    Transport {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the last attempt.
        source: TransportError,
    },

    /// The remote answered but its payload could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The item could not be serialized into a request body.
    #[error("request body encoding failed: {0}")]
    Encode(String),
}

/// Routing parameters could not be turned into a lookup id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The configured parameter key is absent from the route.
    #[error("missing route parameter: {0}")]
    MissingParam(String),

    /// The parameter was expected to be an integer.
    #[error("route parameter {key} is not an integer: {value}")]
    NotAnInteger {
        /// The parameter key.
        key: String,
        /// The raw value received.
        value: String,
    },
}
