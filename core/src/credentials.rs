//! Token resolution and request headers.
//!
//! The token is resolved again for every request; nothing is cached between
//! calls.

use std::env::{self, VarError};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::{Mode, Settings};
use crate::error::{PipefyError, Result};

/// Source of named secret bundles.
pub trait SecretStore: Send + Sync {
    /// Return the raw secret string stored under `name`.
    fn get_secret(&self, name: &str) -> Result<String>;
}

/// A resolved authorization token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `Authorization: Bearer <token>` and `Content-Type: application/json`.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), format!("Bearer {}", self.token)),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

/// Produces [`Credentials`] according to the configured [`Mode`].
#[derive(Clone)]
pub struct CredentialResolver {
    mode: Mode,
    token_var: String,
    secret_name: String,
    secret_key: String,
    store: Arc<dyn SecretStore>,
}

impl CredentialResolver {
    pub fn new(settings: &Settings, store: Arc<dyn SecretStore>) -> Self {
        Self {
            mode: settings.mode,
            token_var: settings.token_var.clone(),
            secret_name: settings.secret_name.clone(),
            secret_key: settings.secret_key.clone(),
            store,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn resolve(&self) -> Result<Credentials> {
        match self.mode {
            Mode::Development => match env::var(&self.token_var) {
                Ok(token) => Ok(Credentials::new(token)),
                Err(VarError::NotPresent) => Err(PipefyError::MissingConfig(self.token_var.clone())),
                Err(VarError::NotUnicode(_)) => Err(PipefyError::InvalidConfig(format!(
                    "{} is not valid UTF-8",
                    self.token_var
                ))),
            },
            Mode::Production => {
                let raw = self.store.get_secret(&self.secret_name)?;
                self.token_from_bundle(&raw).map(Credentials::new)
            }
        }
    }

    fn token_from_bundle(&self, raw: &str) -> Result<String> {
        let secret_error = |reason: String| PipefyError::Secret {
            name: self.secret_name.clone(),
            reason,
        };
        let bundle: Value = serde_json::from_str(raw)
            .map_err(|e| secret_error(format!("bundle is not valid JSON: {e}")))?;
        bundle
            .get(&self.secret_key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| secret_error(format!("bundle has no string `{}`", self.secret_key)))
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("mode", &self.mode)
            .field("token_var", &self.token_var)
            .field("secret_name", &self.secret_name)
            .field("secret_key", &self.secret_key)
            .finish_non_exhaustive()
    }
}
