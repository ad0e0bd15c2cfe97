//! Runtime settings read from the process environment.
//!
//! Values may come from a `.env` file. `ENVIRONMENT=development` switches
//! token resolution to the local `PIPEFY_TOKEN` variable; any other value
//! (or none) goes through the secrets service. The token itself is never stored here: it is read again
//! for every request by [`CredentialResolver`](crate::CredentialResolver).

use std::env;
use std::time::Duration;

use crate::error::{PipefyError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.pipefy.com/graphql";
pub const DEFAULT_TOKEN_VAR: &str = "PIPEFY_TOKEN";
pub const DEFAULT_SECRET_NAME: &str = "secret_tokens";
pub const DEFAULT_SECRET_KEY: &str = "pipefy_token";
pub const DEFAULT_SECRETS_PORT: u16 = 2773;

/// Where the authorization token comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Token read from a local environment variable.
    Development,
    /// Token read from a JSON secret bundle.
    #[default]
    Production,
}

impl Mode {
    /// Only the exact flag `development` selects development mode.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("development") => Mode::Development,
            _ => Mode::Production,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    /// GraphQL endpoint every operation posts to.
    pub endpoint: String,
    /// Environment variable holding the token in development mode.
    pub token_var: String,
    /// Name of the secret bundle in production mode.
    pub secret_name: String,
    /// Key inside the bundle that holds the token.
    pub secret_key: String,
    /// Base URL of the secrets extension, e.g. `http://localhost:2773`.
    pub secrets_endpoint: String,
    pub session_token: Option<String>,
    /// `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token_var: DEFAULT_TOKEN_VAR.to_string(),
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            secrets_endpoint: format!("http://localhost:{DEFAULT_SECRETS_PORT}"),
            session_token: None,
            timeout: None,
        }
    }
}

impl Settings {
    /// Load `.env` from the working directory (or a parent) into the
    /// process environment, then read settings from it. Variables already
    /// set win over the file; a missing file is not an error.
    pub fn from_env() -> Result<Self> {
        load_dotenv()?;
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset or empty keys fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Settings::default();

        let timeout = match get("PIPEFY_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    PipefyError::InvalidConfig(format!(
                        "PIPEFY_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let secrets_endpoint = match get("PARAMETERS_SECRETS_EXTENSION_HTTP_PORT") {
            Some(raw) => {
                let port: u16 = raw.trim().parse().map_err(|_| {
                    PipefyError::InvalidConfig(format!(
                        "PARAMETERS_SECRETS_EXTENSION_HTTP_PORT must be a port number, got '{raw}'"
                    ))
                })?;
                format!("http://localhost:{port}")
            }
            None => defaults.secrets_endpoint,
        };

        Ok(Self {
            mode: Mode::from_flag(get("ENVIRONMENT").as_deref()),
            endpoint: get("PIPEFY_ENDPOINT").unwrap_or(defaults.endpoint),
            token_var: defaults.token_var,
            secret_name: get("PIPEFY_SECRET_NAME").unwrap_or(defaults.secret_name),
            secret_key: get("PIPEFY_SECRET_KEY").unwrap_or(defaults.secret_key),
            secrets_endpoint,
            session_token: get("AWS_SESSION_TOKEN"),
            timeout,
        })
    }
}

fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(PipefyError::InvalidConfig(format!("cannot load .env: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_pipefy_production() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.mode, Mode::Production);
        assert_eq!(s.endpoint, "https://api.pipefy.com/graphql");
        assert_eq!(s.secret_name, "secret_tokens");
        assert_eq!(s.secret_key, "pipefy_token");
        assert_eq!(s.secrets_endpoint, "http://localhost:2773");
        assert!(s.timeout.is_none());
    }

    #[test]
    fn only_exact_development_flag_selects_development() {
        assert_eq!(Mode::from_flag(Some("development")), Mode::Development);
        assert_eq!(Mode::from_flag(Some("Development")), Mode::Production);
        assert_eq!(Mode::from_flag(Some("staging")), Mode::Production);
        assert_eq!(Mode::from_flag(None), Mode::Production);
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(&[
            ("ENVIRONMENT", "development"),
            ("PIPEFY_ENDPOINT", "http://127.0.0.1:9000/graphql"),
            ("PIPEFY_TIMEOUT_SECS", "15"),
            ("PARAMETERS_SECRETS_EXTENSION_HTTP_PORT", "4000"),
            ("AWS_SESSION_TOKEN", "session"),
        ])
        .unwrap();
        assert_eq!(s.mode, Mode::Development);
        assert_eq!(s.endpoint, "http://127.0.0.1:9000/graphql");
        assert_eq!(s.timeout, Some(Duration::from_secs(15)));
        assert_eq!(s.secrets_endpoint, "http://localhost:4000");
        assert_eq!(s.session_token.as_deref(), Some("session"));
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let s = settings(&[("PIPEFY_ENDPOINT", "  ")]).unwrap();
        assert_eq!(s.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn bad_timeout_is_invalid_config() {
        let err = settings(&[("PIPEFY_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, PipefyError::InvalidConfig(_)));
    }
}
