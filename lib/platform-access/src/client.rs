//! Request executor with transparent credential refresh.
//!
//! Every call to the clinic backend goes through [`ApiClient::execute`],
//! which attaches the stored access token, classifies the response and, on a
//! 401, exchanges the stored refresh token for a new access token and retries
//! the call exactly once. Concurrent 401s share one in-flight refresh.
//!
//! The executor never fails across its boundary: every outcome, including
//! network failures, is an [`ApiResponse`].

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::auth::{REFRESH_PATH, TokenRefresh};
use crate::credential::{CredentialPair, CredentialStore};
use crate::error::{ApiError, GENERIC_FAILURE_MESSAGE, TransportError};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Message shown when the backend could not be reached.
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

/// Status reported for outcomes that never produced an HTTP response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

const UNAUTHORIZED_STATUS: u16 = 401;

/// One logical API operation.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    headers: HeaderMap,
    skip_refresh: bool,
}

impl ApiRequest {
    /// Creates a request for `path`, relative to the API base URL.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            skip_refresh: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds an extra header sent with every attempt of this operation.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Disables the refresh-and-retry path: a 401 is surfaced as is.
    ///
    /// Used by login, signup and logout, where a 401 means rejected
    /// credentials rather than an expired access token.
    #[must_use]
    pub(crate) fn without_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Outcome of one logical API operation.
///
/// `status` is the HTTP status of the operation's last attempt, or
/// [`TRANSPORT_FAILURE_STATUS`] when no response arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub result: Result<T, ApiError>,
}

impl<T> ApiResponse<T> {
    /// Returns the payload of a successful call.
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Returns the error of a failed call.
    #[must_use]
    pub fn error(&self) -> Option<&ApiError> {
        self.result.as_ref().err()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Converts the payload, keeping status and error.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            status: self.status,
            result: self.result.map(f),
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        self.result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    Failed,
}

/// What to do after an attempt was rejected with a 401.
enum Recovery {
    /// New credentials are stored; run the operation again.
    Retry,
    /// Refreshing failed and credentials were cleared.
    Expired,
    /// No refresh token is stored; surface the 401.
    Unavailable,
}

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct ClientInner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    pending_refresh: Mutex<Option<PendingRefresh>>,
}

/// Authenticated client for the clinic backend.
///
/// Cheap to clone; clones share the transport, the credential store and the
/// in-flight refresh.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client sending through `transport` with credentials from `store`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                store,
                pending_refresh: Mutex::new(None),
            }),
        }
    }

    /// Returns the credential store this client reads and writes.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Performs one logical API call.
    ///
    /// At most one refresh and one retry happen per call; the retried
    /// attempt's outcome is final whatever its status.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResponse<T> {
        let mut refresh_allowed = !request.skip_refresh;

        loop {
            let access_token = self.inner.store.get().access_token;

            let response = match self.send(request, access_token.as_deref()).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "Request did not reach the server");
                    return ApiResponse {
                        status: TRANSPORT_FAILURE_STATUS,
                        result: Err(ApiError::Transport {
                            message: NETWORK_FAILURE_MESSAGE.to_string(),
                        }),
                    };
                }
            };

            if response.status == UNAUTHORIZED_STATUS && refresh_allowed {
                refresh_allowed = false;
                match self.recover(access_token.as_deref()).await {
                    Recovery::Retry => {
                        debug!("Retrying with refreshed credentials");
                        continue;
                    }
                    Recovery::Expired => {
                        return ApiResponse {
                            status: UNAUTHORIZED_STATUS,
                            result: Err(ApiError::SessionExpired),
                        };
                    }
                    Recovery::Unavailable => {
                        debug!("No refresh token stored; surfacing 401");
                    }
                }
            }

            return classify(response);
        }
    }

    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let mut headers = request.headers.clone();
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => {
                    warn!("Stored access token is not a valid header value; sending unauthenticated");
                }
            }
        }

        self.inner
            .transport
            .send(HttpRequest {
                method: request.method.clone(),
                path: request.path.clone(),
                headers,
                body: request.body.clone(),
            })
            .await
    }

    async fn recover(&self, rejected_token: Option<&str>) -> Recovery {
        let stored = self.inner.store.get();

        // Another call already swapped in new credentials after we sent ours.
        if stored.access_token.is_some() && stored.access_token.as_deref() != rejected_token {
            return Recovery::Retry;
        }

        let Some(refresh_token) = stored.refresh_token else {
            return Recovery::Unavailable;
        };

        match self.refresh_shared(refresh_token).await {
            RefreshOutcome::Refreshed => Recovery::Retry,
            RefreshOutcome::Failed => Recovery::Expired,
        }
    }

    /// Joins the in-flight refresh, or starts one if none is pending.
    async fn refresh_shared(&self, refresh_token: String) -> RefreshOutcome {
        let pending = {
            let mut slot = self.inner.pending_refresh.lock().await;
            match slot.as_ref().filter(|pending| pending.peek().is_none()) {
                Some(pending) => {
                    debug!("Joining in-flight credential refresh");
                    pending.clone()
                }
                None => {
                    let client = self.clone();
                    let pending = async move { client.refresh_credentials(refresh_token).await }
                        .boxed()
                        .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.await;

        // A completed refresh holds a client clone; drop it to break the cycle.
        let mut slot = self.inner.pending_refresh.lock().await;
        if slot.as_ref().is_some_and(|pending| pending.peek().is_some()) {
            *slot = None;
        }

        outcome
    }

    #[instrument(skip_all)]
    async fn refresh_credentials(&self, refresh_token: String) -> RefreshOutcome {
        let request = HttpRequest {
            method: Method::POST,
            path: REFRESH_PATH.to_string(),
            headers: HeaderMap::new(),
            body: Some(serde_json::json!({ "refreshToken": refresh_token })),
        };

        let outcome = match self.inner.transport.send(request).await {
            Ok(response) if is_success(response.status) => {
                match serde_json::from_slice::<TokenRefresh>(&response.body) {
                    Ok(tokens) => {
                        let refresh_token = tokens.refresh_token.unwrap_or(refresh_token);
                        self.inner
                            .store
                            .set(CredentialPair::new(tokens.access_token, refresh_token), None);
                        info!("Credentials refreshed");
                        RefreshOutcome::Refreshed
                    }
                    Err(e) => {
                        warn!(error = %e, "Refresh response did not contain tokens");
                        RefreshOutcome::Failed
                    }
                }
            }
            Ok(response) => {
                warn!(status = response.status, "Credential refresh rejected");
                RefreshOutcome::Failed
            }
            Err(e) => {
                warn!(error = %e, "Credential refresh did not reach the server");
                RefreshOutcome::Failed
            }
        };

        if outcome == RefreshOutcome::Failed {
            self.inner.store.clear();
            info!("Cleared stored credentials after failed refresh");
        }

        outcome
    }
}

fn is_success(status: u16) -> bool {
    status < 400
}

fn classify<T: DeserializeOwned>(response: HttpResponse) -> ApiResponse<T> {
    let status = response.status;

    let result = if is_success(status) {
        decode_body(&response.body)
    } else if status == UNAUTHORIZED_STATUS {
        Err(ApiError::Unauthorized {
            message: server_message(&response.body).unwrap_or_else(|| "Unauthorized".to_string()),
        })
    } else {
        Err(ApiError::RequestFailed {
            status,
            message: server_message(&response.body)
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
        })
    };

    debug!(status, success = result.is_ok(), "Classified response");

    ApiResponse { status, result }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };

    serde_json::from_slice(body).map_err(|e| ApiError::MalformedResponse {
        message: e.to_string(),
    })
}

/// Extracts the server-provided message from an error body.
///
/// Accepts `{"message": "..."}`, `{"error": "..."}` and validation-style
/// `{"message": ["...", "..."]}`.
fn server_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    ["message", "error"].iter().find_map(|key| {
        match value.get(key)? {
            Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
            Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => None,
        }
    })
}
