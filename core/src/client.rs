//! Request builder and response parser for the Pipefy GraphQL API.
//!
//! # Design
//! `PipefyClient` holds the endpoint and the tracing span its events are
//! recorded under; it carries no other state between calls. Each operation
//! is split into a `build_*` method producing an `HttpRequest` and a
//! `parse_*` method consuming an `HttpResponse`.
//!
//! The read path has two parsers. `parse_read_card` keeps the null sentinel:
//! any non-200 status is logged and turned into `None`. `parse_fetch_card`
//! reports the status as an error instead. Neither checks the GraphQL
//! envelope. The create path parses the body whatever the status and always
//! runs [`check_for_errors`].

use serde_json::Value;
use tracing::Span;

use crate::credentials::Credentials;
use crate::error::{PipefyError, Result};
use crate::graphql::{check_for_errors, GraphQlRequest};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CardId, NewCard};

#[derive(Debug, Clone)]
pub struct PipefyClient {
    endpoint: String,
    span: Span,
}

impl PipefyClient {
    pub fn new(endpoint: &str) -> Self {
        let span = tracing::info_span!("pipefy", endpoint = %endpoint);
        Self {
            endpoint: endpoint.to_string(),
            span,
        }
    }

    /// Record this client's events under `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn build_read_card(&self, credentials: &Credentials, card_id: &CardId) -> Result<HttpRequest> {
        self.post(credentials, &GraphQlRequest::read_card(card_id))
    }

    pub fn build_create_card(&self, credentials: &Credentials, card: &NewCard) -> Result<HttpRequest> {
        self.post(credentials, &GraphQlRequest::create_card(card)?)
    }

    /// Returns `None` for any non-200 status.
    pub fn parse_read_card(&self, response: HttpResponse) -> Result<Option<Value>> {
        if response.status != 200 {
            let _enter = self.span.enter();
            tracing::warn!(status = response.status, "failed to read card");
            return Ok(None);
        }
        parse_json(&response.body).map(Some)
    }

    pub fn parse_fetch_card(&self, response: HttpResponse) -> Result<Value> {
        if response.status != 200 {
            return Err(PipefyError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }
        parse_json(&response.body)
    }

    pub fn parse_create_card(&self, response: HttpResponse) -> Result<Value> {
        let envelope = match parse_json(&response.body) {
            Ok(envelope) => envelope,
            Err(_) if !response.is_success() => {
                return Err(PipefyError::HttpStatus {
                    status: response.status,
                    body: response.body,
                })
            }
            Err(e) => return Err(e),
        };
        check_for_errors(&envelope)?;

        let _enter = self.span.enter();
        tracing::info!(
            card_id = ?envelope.pointer("/data/createCard/card/id"),
            "card created"
        );
        Ok(envelope)
    }

    fn post(&self, credentials: &Credentials, body: &GraphQlRequest) -> Result<HttpRequest> {
        let body = serde_json::to_string(body).map_err(|e| PipefyError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.endpoint.clone(),
            headers: credentials.headers(),
            body: Some(body),
        })
    }
}

fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| PipefyError::Deserialization(e.to_string()))
}
