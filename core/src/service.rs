//! End-to-end operations: resolve token, build, send, parse.

use std::sync::Arc;

use serde_json::Value;
use tracing::Span;

use crate::client::PipefyClient;
use crate::config::Settings;
use crate::credentials::CredentialResolver;
use crate::error::Result;
use crate::secrets::LambdaExtensionStore;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CardId, NewCard};

/// Ties a [`PipefyClient`] to a credential source and a transport.
///
/// Credentials are resolved again on every call. Every event an operation
/// emits, the secret lookup included, is recorded inside the client's span.
#[derive(Clone)]
pub struct Pipefy {
    client: PipefyClient,
    credentials: CredentialResolver,
    transport: Arc<dyn Transport>,
}

impl Pipefy {
    pub fn new(client: PipefyClient, credentials: CredentialResolver, transport: Arc<dyn Transport>) -> Self {
        Self {
            client,
            credentials,
            transport,
        }
    }

    /// Wire the default stack: a `ureq` transport shared between the API
    /// calls and the secrets extension lookup.
    pub fn from_settings(settings: &Settings) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(UreqTransport::new(settings.timeout));
        let store = LambdaExtensionStore::from_settings(settings, transport.clone());
        Self::new(
            PipefyClient::new(&settings.endpoint),
            CredentialResolver::new(settings, Arc::new(store)),
            transport,
        )
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::from_settings(&Settings::from_env()?))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.client = self.client.with_span(span);
        self
    }

    pub fn client(&self) -> &PipefyClient {
        &self.client
    }

    /// Read a card's fields. Any non-200 answer yields `Ok(None)`.
    pub fn read_card(&self, card_id: impl Into<CardId>) -> Result<Option<Value>> {
        let card_id = card_id.into();
        let _enter = self.client.span().enter();
        let credentials = self.credentials.resolve()?;
        let request = self.client.build_read_card(&credentials, &card_id)?;
        tracing::debug!(operation = "read_card", card_id = %card_id, "posting GraphQL request");
        let response = self.transport.execute(request)?;
        self.client.parse_read_card(response)
    }

    /// Like [`Pipefy::read_card`], but a non-200 answer is an error.
    pub fn fetch_card(&self, card_id: impl Into<CardId>) -> Result<Value> {
        let card_id = card_id.into();
        let _enter = self.client.span().enter();
        let credentials = self.credentials.resolve()?;
        let request = self.client.build_read_card(&credentials, &card_id)?;
        tracing::debug!(operation = "fetch_card", card_id = %card_id, "posting GraphQL request");
        let response = self.transport.execute(request)?;
        self.client.parse_fetch_card(response)
    }

    pub fn create_card(&self, card: &NewCard) -> Result<Value> {
        let _enter = self.client.span().enter();
        let credentials = self.credentials.resolve()?;
        let request = self.client.build_create_card(&credentials, card)?;
        tracing::debug!(operation = "create_card", pipe_id = %card.pipe_id, "posting GraphQL request");
        let response = self.transport.execute(request)?;
        self.client.parse_create_card(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::credentials::SecretStore;
    use crate::error::{ErrorKind, PipefyError};
    use crate::http::{HttpRequest, HttpResponse};
    use serde_json::json;
    use std::sync::Mutex;

    struct StaticSecret(&'static str);

    /// Remembers the name of the span current at each lookup.
    #[derive(Default)]
    struct SpanRecordingSecret {
        spans: Mutex<Vec<Option<&'static str>>>,
    }

    impl SecretStore for SpanRecordingSecret {
        fn get_secret(&self, _name: &str) -> Result<String> {
            let name = Span::current().metadata().map(|m| m.name());
            self.spans.lock().unwrap().push(name);
            Ok(r#"{"pipefy_token": "tok"}"#.to_string())
        }
    }

    impl SecretStore for StaticSecret {
        fn get_secret(&self, _name: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Replays canned responses and keeps every request it was given.
    struct Scripted {
        responses: Mutex<Vec<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
            let responses = responses
                .into_iter()
                .rev()
                .map(|(status, body)| HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                })
                .collect();
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| PipefyError::Request("no scripted response left".to_string()))
        }
    }

    fn pipefy(secret: &'static str, transport: Arc<Scripted>) -> Pipefy {
        let settings = Settings {
            mode: Mode::Production,
            endpoint: "http://pipefy.test/graphql".to_string(),
            ..Settings::default()
        };
        Pipefy::new(
            PipefyClient::new(&settings.endpoint),
            CredentialResolver::new(&settings, Arc::new(StaticSecret(secret))),
            transport,
        )
    }

    fn lead() -> NewCard {
        NewCard {
            pipe_id: "1".to_string(),
            phase_id: "2".to_string(),
            nome: "Ana".to_string(),
            cpf: "000".to_string(),
            telefone: "11999999999".to_string(),
            email: "a@b.com".to_string(),
        }
    }

    #[test]
    fn read_card_sends_bearer_token_from_secret() {
        let transport = Scripted::new(vec![(200, r#"{"data": {"card": {"fields": []}}}"#)]);
        let api = pipefy(r#"{"pipefy_token": "tok"}"#, transport.clone());

        let card = api.read_card(123u64).unwrap();
        assert_eq!(card, Some(json!({"data": {"card": {"fields": []}}})));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://pipefy.test/graphql");
        assert_eq!(requests[0].header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn read_card_404_is_none() {
        let api = pipefy(r#"{"pipefy_token": "tok"}"#, Scripted::new(vec![(404, "")]));
        assert_eq!(api.read_card("123").unwrap(), None);
    }

    #[test]
    fn fetch_card_404_is_transport_error() {
        let api = pipefy(r#"{"pipefy_token": "tok"}"#, Scripted::new(vec![(404, "")]));
        let err = api.fetch_card("123").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn create_card_raises_on_graphql_errors() {
        let transport = Scripted::new(vec![(200, r#"{"errors": [{"message": "Field not found"}]}"#)]);
        let api = pipefy(r#"{"pipefy_token": "tok"}"#, transport);
        let err = api.create_card(&lead()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GraphQl);
    }

    #[test]
    fn create_card_returns_envelope() {
        let transport = Scripted::new(vec![(
            200,
            r#"{"data": {"createCard": {"card": {"id": "55", "title": "Ana"}}}}"#,
        )]);
        let api = pipefy(r#"{"pipefy_token": "tok"}"#, transport);
        let envelope = api.create_card(&lead()).unwrap();
        assert_eq!(envelope["data"]["createCard"]["card"]["id"], "55");
    }

    #[test]
    fn bad_secret_stops_before_any_request() {
        let transport = Scripted::new(vec![]);
        let api = pipefy("{}", transport.clone());
        let err = api.read_card(1u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn transport_failure_surfaces_on_both_paths() {
        let api = pipefy(r#"{"pipefy_token": "tok"}"#, Scripted::new(vec![]));
        assert!(matches!(api.read_card(1u64).unwrap_err(), PipefyError::Request(_)));
        assert!(matches!(api.create_card(&lead()).unwrap_err(), PipefyError::Request(_)));
    }

    #[test]
    fn secret_lookup_runs_inside_injected_span() {
        let store = Arc::new(SpanRecordingSecret::default());
        let settings = Settings {
            mode: Mode::Production,
            ..Settings::default()
        };

        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let api = Pipefy::new(
                PipefyClient::new(&settings.endpoint),
                CredentialResolver::new(&settings, store.clone()),
                Scripted::new(vec![
                    (200, r#"{"data": {"card": {"fields": []}}}"#),
                    (200, r#"{"data": {"createCard": {"card": {"id": "1", "title": "Ana"}}}}"#),
                ]),
            )
            .with_span(tracing::info_span!("lead_intake"));

            api.read_card(1u64).unwrap();
            api.create_card(&lead()).unwrap();
        });

        let spans = store.spans.lock().unwrap();
        assert_eq!(*spans, vec![Some("lead_intake"), Some("lead_intake")]);
    }
}
