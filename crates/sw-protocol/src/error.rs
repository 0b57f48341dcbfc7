//! Protocol error types

use thiserror::Error;

/// Errors that can occur while validating or decoding protocol payloads
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Command kind is not part of the fixed vocabulary
    #[error("Unknown command kind: {0}")]
    UnknownCommandKind(String),

    /// Command parameters are missing or ill-typed for the given kind
    #[error("Invalid parameters for {kind}: {reason}")]
    InvalidParameters { kind: String, reason: String },

    /// An envelope arrived that is not legal at this point of the exchange
    #[error("Unexpected envelope: expected {expected}, got {got}")]
    UnexpectedEnvelope {
        expected: &'static str,
        got: String,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
