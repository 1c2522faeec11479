//! Pre-render route guard.
//!
//! Decides redirects from path prefixes and the presence of a credential
//! signal alone. No network calls, no role checks.

use serde::{Deserialize, Deserializer};

/// Guard settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardConfig {
    /// Prefixes that require a credential. Comma-separated in the environment.
    #[serde(default = "default_protected", deserialize_with = "prefix_list")]
    pub protected_prefixes: Vec<String>,

    /// Prefixes only reachable without a credential.
    #[serde(default = "default_auth_only", deserialize_with = "prefix_list")]
    pub auth_only_prefixes: Vec<String>,

    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,

    #[serde(default = "default_home_path")]
    pub home_path: String,

    /// Cookie carrying the access token.
    #[serde(default = "default_access_cookie")]
    pub access_cookie: String,

    /// Profile-mirror cookie that must accompany the access token, if set.
    #[serde(default)]
    pub profile_cookie: Option<String>,
}

fn default_protected() -> Vec<String> {
    vec!["/dashboard".to_string()]
}

fn default_auth_only() -> Vec<String> {
    vec!["/signin".to_string(), "/reset-password".to_string()]
}

fn default_sign_in_path() -> String {
    "/signin".to_string()
}

fn default_home_path() -> String {
    "/dashboard".to_string()
}

fn default_access_cookie() -> String {
    "accessToken".to_string()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: default_protected(),
            auth_only_prefixes: default_auth_only(),
            sign_in_path: default_sign_in_path(),
            home_path: default_home_path(),
            access_cookie: default_access_cookie(),
            profile_cookie: None,
        }
    }
}

/// Accepts `"/a, /b"` or `["/a", "/b"]`.
fn prefix_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        List(Vec<String>),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        Raw::List(items) => items,
    };

    Ok(items
        .iter()
        .map(|item| normalize_prefix(item))
        .filter(|item| !item.is_empty())
        .collect())
}

/// Trims whitespace and trailing slashes and adds a leading slash. A bare
/// `/` is kept and matches every path.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.trim_end_matches('/') {
        "" => "/".to_string(),
        p if p.starts_with('/') => p.to_string(),
        p => format!("/{p}"),
    }
}

/// Classification of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthOnly,
    Public,
}

/// What to do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Route guard built from a [`GuardConfig`].
#[derive(Debug, Clone)]
pub struct RouteGuard {
    config: GuardConfig,
}

impl RouteGuard {
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Classifies a path. Protected wins over auth-only if both match.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if matches_any(&self.config.protected_prefixes, path) {
            RouteClass::Protected
        } else if matches_any(&self.config.auth_only_prefixes, path) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Public
        }
    }

    /// Decides a navigation given whether a credential signal is present.
    #[must_use]
    pub fn decide(&self, path: &str, has_credential: bool) -> GuardDecision {
        match (self.classify(path), has_credential) {
            (RouteClass::Protected, false) => {
                GuardDecision::Redirect(self.config.sign_in_path.clone())
            }
            (RouteClass::AuthOnly, true) => GuardDecision::Redirect(self.config.home_path.clone()),
            _ => GuardDecision::Allow,
        }
    }

    /// Combines the raw cookie/header values into a credential signal.
    ///
    /// The access token must be non-empty. When a profile-mirror cookie is
    /// configured, it must be non-empty too.
    #[must_use]
    pub fn credential_present(&self, access_token: Option<&str>, profile: Option<&str>) -> bool {
        let has_token = access_token.is_some_and(|t| !t.trim().is_empty());
        let has_profile =
            self.config.profile_cookie.is_none() || profile.is_some_and(|p| !p.trim().is_empty());
        has_token && has_profile
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

/// Segment-aware prefix match: `/dashboard` matches `/dashboard/x`, not
/// `/dashboards`.
fn matches_any(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|prefix| {
        prefix == "/"
            || path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}
