//! Credentialed, synchronous client for the Pipefy GraphQL API.
//!
//! # Overview
//! Two operations: read a card's fields and create a card carrying lead
//! data. Requests are built as plain `HttpRequest` values and responses
//! parsed from plain `HttpResponse` values (host-does-IO pattern); a
//! [`Transport`] performs the blocking round-trip in between.
//!
//! # Design
//! - `PipefyClient` holds only the endpoint and its tracing span.
//! - `CredentialResolver` produces a fresh bearer token per request, from
//!   `PIPEFY_TOKEN` in development or a JSON secret bundle otherwise.
//! - `Pipefy` wires resolver, client and transport into one call per
//!   operation.
//! - Every failure is a [`PipefyError`] with an [`ErrorKind`].

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod graphql;
pub mod http;
pub mod secrets;
pub mod service;
pub mod transport;
pub mod types;

pub use client::PipefyClient;
pub use config::{Mode, Settings};
pub use credentials::{CredentialResolver, Credentials, SecretStore};
pub use error::{ErrorKind, PipefyError, Result};
pub use graphql::{check_for_errors, GraphQlRequest};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use secrets::LambdaExtensionStore;
pub use service::Pipefy;
pub use transport::{Transport, UreqTransport};
pub use types::{CardId, NewCard};
