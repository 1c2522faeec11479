//! Client configuration, loaded via the `config` crate from environment
//! variables prefixed with `CLINIC`.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::SessionRoutes;

/// Settings for anything that talks to the clinic backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Base URL every API path is appended to.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// JSON file holding the durable credentials.
    #[serde(default = "default_credential_file")]
    pub credential_file: PathBuf,

    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,

    #[serde(default = "default_home_path")]
    pub home_path: String,

    /// Per-request timeout. Unset means no timeout.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_api_base_url() -> String {
    "http://localhost:4000/api".to_string()
}

fn default_credential_file() -> PathBuf {
    PathBuf::from(".clinic-portal/session.json")
}

fn default_sign_in_path() -> String {
    "/signin".to_string()
}

fn default_home_path() -> String {
    "/dashboard".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            credential_file: default_credential_file(),
            sign_in_path: default_sign_in_path(),
            home_path: default_home_path(),
            request_timeout_seconds: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `CLINIC__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::with_prefix("CLINIC")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source(
        source: impl config::Source + Send + Sync + 'static,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }

    #[must_use]
    pub fn session_routes(&self) -> SessionRoutes {
        SessionRoutes {
            sign_in: self.sign_in_path.clone(),
            home: self.home_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        config::Environment::with_prefix("CLINIC")
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = ClientConfig::from_source(env(&[])).expect("config");
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.session_routes(), SessionRoutes::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ClientConfig::from_source(env(&[
            ("CLINIC__API_BASE_URL", "https://api.clinic.example"),
            ("CLINIC__REQUEST_TIMEOUT_SECONDS", "15"),
            ("CLINIC__HOME_PATH", "/dashboard/agenda"),
        ]))
        .expect("config");

        assert_eq!(config.api_base_url, "https://api.clinic.example");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.session_routes().home, "/dashboard/agenda");
        assert_eq!(config.sign_in_path, "/signin");
    }
}
