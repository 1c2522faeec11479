//! Network seam under the request executor.
//!
//! The executor speaks to the backend only through [`Transport`], which
//! sends one HTTP request and returns the raw status and body. Production
//! code uses [`ReqwestTransport`]; tests substitute a scripted double.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;

/// One outbound HTTP request, relative to the API base URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Path below the API base URL, starting with `/`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends HTTP requests to the clinic backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response, whatever its status.
    ///
    /// Only failures to obtain a response at all are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> clinic_portal_core::Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| TransportError::Configuration {
            details: format!("failed to create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest {
                    details: e.to_string(),
                }
            } else {
                TransportError::Network {
                    details: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network {
                details: format!("failed to read response body: {e}"),
            })?
            .to_vec();

        debug!(%url, status, "HTTP response received");

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for executor and controller tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

    /// Transport that answers each path with a scripted handler and records
    /// every request it sees.
    pub(crate) struct ScriptedTransport {
        handlers: HashMap<String, Handler>,
        delays: HashMap<String, Duration>,
        log: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self {
                handlers: HashMap::new(),
                delays: HashMap::new(),
                log: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn on<F>(mut self, path: &str, handler: F) -> Self
        where
            F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
        {
            self.handlers.insert(path.to_string(), Box::new(handler));
            self
        }

        pub(crate) fn delay(mut self, path: &str, delay: Duration) -> Self {
            self.delays.insert(path.to_string(), delay);
            self
        }

        pub(crate) fn calls(&self, path: &str) -> usize {
            self.requests().iter().filter(|r| r.path == path).count()
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.log.lock().expect("request log").clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.log.lock().expect("request log").push(request.clone());

            if let Some(delay) = self.delays.get(&request.path) {
                tokio::time::sleep(*delay).await;
            }

            match self.handlers.get(&request.path) {
                Some(handler) => handler(&request),
                None => json(404, serde_json::json!({ "message": "Not found" })),
            }
        }
    }

    /// Builds a JSON response.
    pub(crate) fn json(
        status: u16,
        body: serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status,
            body: serde_json::to_vec(&body).expect("serialize body"),
        })
    }

    /// Builds a transport failure.
    pub(crate) fn unreachable() -> Result<HttpResponse, TransportError> {
        Err(TransportError::Network {
            details: "connection refused".to_string(),
        })
    }

    /// Returns the bearer token attached to a request, if any.
    pub(crate) fn bearer(request: &HttpRequest) -> Option<String> {
        request
            .headers
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    }
}
