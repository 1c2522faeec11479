//! Authentication endpoint contracts consumed by the portal.
//!
//! This module describes the backend's `/auth/*` endpoints and wraps each of
//! them in an [`ApiClient`] method. Login is the only call that writes
//! tokens here; refresh is handled inside the executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{info, instrument, warn};

use crate::client::{ApiClient, ApiRequest, ApiResponse, TRANSPORT_FAILURE_STATUS};
use crate::credential::CredentialPair;
use crate::error::ApiError;
use crate::user::{Profile, ProfileUpdate};

pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const PROFILE_PATH: &str = "/auth/profile";
pub const VERIFY_PATH: &str = "/auth/verify";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Email and password submitted on the sign-in screen.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user: Option<Profile>,
    #[serde(default)]
    pub tokens: Option<CredentialPair>,
}

/// Account registration payload for `POST /auth/signup`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_name: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("phone", &self.phone)
            .field("clinic_name", &self.clinic_name)
            .finish()
    }
}

/// Confirmation returned by `POST /auth/signup`. No tokens are issued.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<Profile>,
}

/// Body of `GET /auth/verify` and `PUT /auth/profile`.
#[derive(Debug, Clone, Deserialize)]
struct ProfileEnvelope {
    #[serde(default)]
    user: Option<Profile>,
}

/// Body of a successful `POST /auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRefresh {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
}

fn encode<T: Serialize>(body: &T) -> Result<Value, ApiResponse<Option<Profile>>> {
    serde_json::to_value(body).map_err(|e| ApiResponse {
        status: TRANSPORT_FAILURE_STATUS,
        result: Err(ApiError::Transport {
            message: format!("failed to encode request body: {e}"),
        }),
    })
}

impl ApiClient {
    /// Signs in and stores the issued credential pair with the profile.
    ///
    /// Resolves to the profile, or `None` when the backend answered without
    /// both a user and tokens (nothing is stored in that case). A 401 here
    /// means bad credentials, so no refresh is attempted.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResponse<Option<Profile>> {
        let body = match encode(credentials) {
            Ok(body) => body,
            Err(response) => return response,
        };
        let request = ApiRequest::post(LOGIN_PATH).json(body).without_refresh();

        self.execute::<LoginResponse>(&request)
            .await
            .map(|response| match response {
                LoginResponse {
                    user: Some(user),
                    tokens: Some(tokens),
                } => {
                    self.store().set(tokens, Some(user.clone()));
                    info!(user_id = %user.id(), "Signed in");
                    Some(user)
                }
                _ => {
                    warn!("Login response lacked a user or tokens");
                    None
                }
            })
    }

    /// Creates an account. Does not sign in.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> ApiResponse<Option<RegistrationReceipt>> {
        let body = match encode(registration) {
            Ok(body) => body,
            Err(response) => return response.map(|_| None),
        };
        let request = ApiRequest::post(SIGNUP_PATH).json(body).without_refresh();

        self.execute(&request).await
    }

    /// Tells the backend the session is over. Never touches local state.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> ApiResponse<Option<Value>> {
        let request = ApiRequest::post(LOGOUT_PATH).without_refresh();
        self.execute(&request).await
    }

    /// Resolves the profile belonging to the stored access token.
    #[instrument(skip_all)]
    pub async fn verify(&self) -> ApiResponse<Option<Profile>> {
        self.execute::<ProfileEnvelope>(&ApiRequest::get(VERIFY_PATH))
            .await
            .map(|envelope| envelope.user)
    }

    /// Sends a partial profile update and returns the server's profile.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResponse<Option<Profile>> {
        let body = match encode(update) {
            Ok(body) => body,
            Err(response) => return response,
        };

        self.execute::<ProfileEnvelope>(&ApiRequest::put(PROFILE_PATH).json(body))
            .await
            .map(|envelope| envelope.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CredentialStore, MemoryCredentialStore, StoredCredentials};
    use crate::role::Role;
    use crate::transport::mock::{ScriptedTransport, bearer, json};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn manager_json() -> Value {
        json!({ "id": "u-7", "role": "manager", "permissions": ["reports:view"] })
    }

    #[tokio::test]
    async fn login_stores_tokens_and_returns_profile() {
        let transport = Arc::new(ScriptedTransport::new().on(LOGIN_PATH, |_| {
            json(
                200,
                json!({
                    "user": manager_json(),
                    "tokens": { "accessToken": "a1", "refreshToken": "r1" }
                }),
            )
        }));
        let store = Arc::new(MemoryCredentialStore::new());
        let client = ApiClient::new(transport.clone(), store.clone());

        let response = client
            .login(&LoginCredentials::new("m@clinic.example", "s3cret"))
            .await;

        let profile = response.data().cloned().flatten().expect("profile");
        assert_eq!(profile.role(), Role::Manager);

        let stored = store.get();
        assert_eq!(stored.access_token.as_deref(), Some("a1"));
        assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
        assert_eq!(stored.profile, Some(profile));

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(
            sent.body,
            Some(json!({ "email": "m@clinic.example", "password": "s3cret" }))
        );
    }

    #[tokio::test]
    async fn login_without_tokens_stores_nothing() {
        let transport = Arc::new(
            ScriptedTransport::new().on(LOGIN_PATH, |_| json(200, json!({ "user": manager_json() }))),
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let client = ApiClient::new(transport, store.clone());

        let response = client.login(&LoginCredentials::new("m@clinic.example", "x")).await;

        assert_eq!(response.data(), Some(&None));
        assert!(store.get().is_empty());
    }

    #[tokio::test]
    async fn bad_password_does_not_refresh() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(LOGIN_PATH, |_| json(401, json!({ "message": "Invalid credentials" })))
                .on(REFRESH_PATH, |_| json(200, json!({ "accessToken": "x" }))),
        );
        let store = Arc::new(MemoryCredentialStore::with_contents(StoredCredentials {
            refresh_token: Some("old".to_string()),
            ..StoredCredentials::default()
        }));
        let client = ApiClient::new(transport.clone(), store);

        let response = client.login(&LoginCredentials::new("m@clinic.example", "bad")).await;

        assert_eq!(response.status, 401);
        assert_eq!(
            response.error().map(ApiError::message),
            Some("Invalid credentials")
        );
        assert_eq!(transport.calls(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn register_sends_payload_and_issues_no_tokens() {
        let transport = Arc::new(ScriptedTransport::new().on(SIGNUP_PATH, |_| {
            json(201, json!({ "message": "Check your inbox to activate the account" }))
        }));
        let store = Arc::new(MemoryCredentialStore::new());
        let client = ApiClient::new(transport.clone(), store.clone());

        let registration = Registration {
            email: "new@clinic.example".to_string(),
            password: "pw".to_string(),
            full_name: "New Person".to_string(),
            phone: None,
            clinic_name: Some("Fisio Centro".to_string()),
        };
        let response = client.register(&registration).await;

        assert_eq!(response.status, 201);
        assert_eq!(
            response
                .data()
                .and_then(Option::as_ref)
                .and_then(|r| r.message.as_deref()),
            Some("Check your inbox to activate the account")
        );
        assert!(store.get().is_empty());
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({
                "email": "new@clinic.example",
                "password": "pw",
                "fullName": "New Person",
                "clinicName": "Fisio Centro"
            }))
        );
    }

    #[tokio::test]
    async fn verify_uses_stored_access_token() {
        let transport = Arc::new(ScriptedTransport::new().on(VERIFY_PATH, |req| {
            match bearer(req).as_deref() {
                Some("a1") => json(200, json!({ "user": manager_json() })),
                _ => json(401, json!({})),
            }
        }));
        let store = Arc::new(MemoryCredentialStore::with_contents(StoredCredentials {
            access_token: Some("a1".to_string()),
            ..StoredCredentials::default()
        }));
        let client = ApiClient::new(transport, store);

        let response = client.verify().await;

        let profile = response.data().cloned().flatten().expect("profile");
        assert_eq!(profile.id().as_str(), "u-7");
    }

    #[tokio::test]
    async fn update_profile_puts_partial_body() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(PROFILE_PATH, |_| json(200, json!({ "user": manager_json() }))),
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let client = ApiClient::new(transport.clone(), store);

        let update = ProfileUpdate {
            full_name: Some("Marta S.".to_string()),
            ..ProfileUpdate::default()
        };
        let response = client.update_profile(&update).await;

        assert!(response.is_success());
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::PUT);
        assert_eq!(sent.body, Some(json!({ "fullName": "Marta S." })));
    }

    #[tokio::test]
    async fn logout_never_refreshes() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(LOGOUT_PATH, |_| json(401, json!({})))
                .on(REFRESH_PATH, |_| json(200, json!({ "accessToken": "x" }))),
        );
        let store = Arc::new(MemoryCredentialStore::with_contents(StoredCredentials {
            access_token: Some("a1".to_string()),
            refresh_token: Some("r1".to_string()),
            profile: None,
        }));
        let client = ApiClient::new(transport.clone(), store);

        let response = client.logout().await;

        assert!(!response.is_success());
        assert_eq!(transport.calls(REFRESH_PATH), 0);
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let rendered = format!("{:?}", LoginCredentials::new("a@b.c", "hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("a@b.c"));
    }
}
