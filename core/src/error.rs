//! Error types for the Pipefy client.
//!
//! # Design
//! Every failure, whether it comes from configuration, the secrets lookup,
//! the HTTP round-trip or the GraphQL envelope, is a `PipefyError`. Callers
//! that only care about the broad class call [`PipefyError::kind`].

use serde_json::Value;
use thiserror::Error;

/// Broad classification of a [`PipefyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid settings, or an unusable secret bundle.
    Configuration,
    /// The request never produced a usable HTTP response.
    Transport,
    /// The API answered with an `errors` or `error` key.
    GraphQl,
}

/// Errors returned by the client, the credential resolver and the transport.
#[derive(Debug, Error)]
pub enum PipefyError {
    /// A required environment value is not set.
    #[error("missing configuration: {0} is not set")]
    MissingConfig(String),

    /// A setting is present but cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The secret bundle could not be fetched or does not hold the token.
    #[error("secret `{name}` unavailable: {reason}")]
    Secret { name: String, reason: String },

    /// The HTTP round-trip failed before a response was received.
    #[error("request failed: {0}")]
    Request(String),

    /// The server returned a status the operation does not accept.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body is not the JSON the operation expects.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Top-level `errors` key in the response envelope.
    #[error("GraphQL Error: {0}")]
    GraphQl(Value),

    /// Top-level `error` key in the response envelope.
    #[error("Error: {0}")]
    Api(Value),
}

impl PipefyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipefyError::MissingConfig(_)
            | PipefyError::InvalidConfig(_)
            | PipefyError::Secret { .. } => ErrorKind::Configuration,
            PipefyError::Request(_)
            | PipefyError::HttpStatus { .. }
            | PipefyError::Serialization(_)
            | PipefyError::Deserialization(_) => ErrorKind::Transport,
            PipefyError::GraphQl(_) | PipefyError::Api(_) => ErrorKind::GraphQl,
        }
    }
}

pub type Result<T, E = PipefyError> = std::result::Result<T, E>;
