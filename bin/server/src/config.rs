//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the front server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`GuardConfig`] for the route guard settings, read from `GUARD__*`.

use clinic_portal_platform_access::GuardConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Front server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory holding the built site.
    #[serde(default = "default_site_root")]
    pub site_root: PathBuf,

    /// Route guard configuration.
    #[serde(default)]
    pub guard: GuardConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_site_root() -> PathBuf {
    PathBuf::from("target/site")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            site_root: default_site_root(),
            guard: GuardConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
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
        config::Environment::default()
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn server_config_has_correct_defaults() {
        let config = ServerConfig::from_source(env(&[])).expect("config");
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert_eq!(config.site_root, PathBuf::from("target/site"));
        assert_eq!(config.guard, GuardConfig::default());
    }

    #[test]
    fn guard_settings_come_from_nested_keys() {
        let config = ServerConfig::from_source(env(&[
            ("BIND_ADDRESS", "0.0.0.0:8080"),
            ("GUARD__PROTECTED_PREFIXES", "/dashboard,/reports"),
            ("GUARD__PROFILE_COOKIE", "user"),
        ]))
        .expect("config");

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.guard.protected_prefixes, vec!["/dashboard", "/reports"]);
        assert_eq!(config.guard.profile_cookie.as_deref(), Some("user"));
        assert_eq!(config.guard.access_cookie, "accessToken");
    }
}
