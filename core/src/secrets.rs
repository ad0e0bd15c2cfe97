//! Secret lookup through the AWS Parameters and Secrets Lambda extension.
//!
//! The extension serves `GET /secretsmanager/get?secretId=<name>` on
//! localhost and authenticates callers with the function's session token.
//! The secret itself comes back under `SecretString`.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

use crate::config::Settings;
use crate::credentials::SecretStore;
use crate::error::{PipefyError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

pub const SESSION_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecretValue {
    secret_string: Option<String>,
}

/// [`SecretStore`] that asks the Lambda secrets extension.
#[derive(Clone)]
pub struct LambdaExtensionStore {
    base_url: String,
    session_token: Option<String>,
    transport: Arc<dyn Transport>,
}

impl LambdaExtensionStore {
    pub fn new(base_url: &str, session_token: Option<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token,
            transport,
        }
    }

    pub fn from_settings(settings: &Settings, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            &settings.secrets_endpoint,
            settings.session_token.clone(),
            transport,
        )
    }

    pub fn build_get_secret(&self, name: &str) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = &self.session_token {
            headers.push((SESSION_TOKEN_HEADER.to_string(), token.clone()));
        }
        HttpRequest {
            method: HttpMethod::Get,
            url: format!(
                "{}/secretsmanager/get?secretId={}",
                self.base_url,
                utf8_percent_encode(name, NON_ALPHANUMERIC)
            ),
            headers,
            body: None,
        }
    }

    pub fn parse_get_secret(&self, name: &str, response: HttpResponse) -> Result<String> {
        let secret_error = |reason: String| PipefyError::Secret {
            name: name.to_string(),
            reason,
        };
        if response.status != 200 {
            return Err(secret_error(format!(
                "secrets extension returned HTTP {}: {}",
                response.status, response.body
            )));
        }
        let value: SecretValue = serde_json::from_str(&response.body)
            .map_err(|e| secret_error(format!("unreadable extension response: {e}")))?;
        value
            .secret_string
            .ok_or_else(|| secret_error("secret has no SecretString".to_string()))
    }
}

impl SecretStore for LambdaExtensionStore {
    fn get_secret(&self, name: &str) -> Result<String> {
        tracing::debug!(secret = name, "fetching secret bundle");
        let response = self.transport.execute(self.build_get_secret(name))?;
        self.parse_get_secret(name, response)
    }
}
