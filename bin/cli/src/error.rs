//! Error types for the command-line client.

use clinic_portal_platform_access::{ApiError, SessionError};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    /// Configuration, credential file or HTTP client could not be set up.
    Setup { details: String },
    /// A session operation failed.
    Session(SessionError),
    /// An API call failed.
    Api { status: u16, error: ApiError },
    /// The command line asked for nothing to do.
    NothingToDo { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup { details } => write!(f, "setup failed: {}", details),
            Self::Session(err) => write!(f, "{}", err.message()),
            Self::Api { status, error } => write!(f, "{} (status {})", error.message(), status),
            Self::NothingToDo { details } => write!(f, "{}", details),
        }
    }
}

impl std::error::Error for CliError {}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}
