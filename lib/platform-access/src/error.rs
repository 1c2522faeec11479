//! Error types for the platform-access crate.
//!
//! - `ApiError`: outcome of a failed API call, carried inside `ApiResponse`
//! - `SessionError`: failures surfaced by the session controller
//! - `StoreError`: durable credential storage failures (wrapped in a rootcause `Report`)
//! - `TransportError`: network-level failures below the request executor

use std::fmt;

/// Message shown when a request fails without a usable server message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Message shown when credentials could not be refreshed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Errors from a single logical API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    Transport { message: String },
    /// A success status arrived with a body that could not be decoded.
    MalformedResponse { message: String },
    /// The server rejected the credentials and no refresh was possible.
    Unauthorized { message: String },
    /// The refresh call failed; stored credentials have been cleared.
    SessionExpired,
    /// Any other error status.
    RequestFailed { status: u16, message: String },
}

impl ApiError {
    /// Returns true if the caller must sign in again.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns the human-readable message for display.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message }
            | Self::MalformedResponse { message }
            | Self::Unauthorized { message }
            | Self::RequestFailed { message, .. } => message,
            Self::SessionExpired => SESSION_EXPIRED_MESSAGE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "network error: {message}"),
            Self::MalformedResponse { message } => write!(f, "malformed response: {message}"),
            Self::Unauthorized { message } => write!(f, "unauthorized: {message}"),
            Self::SessionExpired => write!(f, "session expired"),
            Self::RequestFailed { status, message } => {
                write!(f, "request failed with status {status}: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors surfaced by the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The operation needs a signed-in user.
    NotAuthenticated,
    /// The backend answered without the expected profile.
    MissingProfile,
    /// The underlying API call failed.
    Api(ApiError),
}

impl SessionError {
    /// Returns the human-readable message retained in session state.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NotAuthenticated => "You are not signed in".to_string(),
            Self::MissingProfile => "The server did not return a user profile".to_string(),
            Self::Api(err) => err.message().to_string(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::MissingProfile => write!(f, "response did not contain a user profile"),
            Self::Api(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// Errors from durable credential storage.
#[derive(Debug)]
pub enum StoreError {
    /// The credential file exists but could not be read.
    Read { path: String, details: String },
    /// The credential directory could not be created.
    CreateDir { path: String, details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, details } => {
                write!(f, "failed to read credential file '{path}': {details}")
            }
            Self::CreateDir { path, details } => {
                write!(f, "failed to create credential directory '{path}': {details}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The HTTP client could not be built.
    Configuration { details: String },
    /// The request could not be built from its parts.
    InvalidRequest { details: String },
    /// The request was sent but no complete response arrived.
    Network { details: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => {
                write!(f, "HTTP client configuration error: {details}")
            }
            Self::InvalidRequest { details } => write!(f, "invalid request: {details}"),
            Self::Network { details } => write!(f, "network error: {details}"),
        }
    }
}

impl std::error::Error for TransportError {}
