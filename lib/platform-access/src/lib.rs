//! Authenticated request layer for the clinic portal.
//!
//! This crate provides:
//! - Staff roles and permissions (`Role`, `PermissionSet`) and the `Profile`
//! - Durable credential storage (`CredentialStore`, `FileCredentialStore`)
//! - The request executor with single refresh-and-retry (`ApiClient`)
//! - The session state machine (`SessionController`)
//! - The pre-render route guard (`RouteGuard`)
//!
//! # Example
//!
//! ```
//! use clinic_portal_platform_access::{GuardDecision, RouteGuard};
//!
//! let guard = RouteGuard::default();
//! assert_eq!(
//!     guard.decide("/dashboard/patients", false),
//!     GuardDecision::Redirect("/signin".to_string())
//! );
//! assert_eq!(guard.decide("/dashboard/patients", true), GuardDecision::Allow);
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod guard;
pub mod role;
pub mod session;
pub mod transport;
pub mod user;

// Re-export main types at crate root
pub use auth::{LoginCredentials, Registration, RegistrationReceipt};
pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use config::ClientConfig;
pub use credential::{
    CredentialPair, CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredCredentials,
};
pub use error::{ApiError, SessionError, StoreError, TransportError};
pub use guard::{GuardConfig, GuardDecision, RouteClass, RouteGuard};
pub use role::{PermissionSet, Role};
pub use session::{
    Navigator, SessionController, SessionRoutes, SessionState, SessionStatus, StayPut,
};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use user::{Profile, ProfileUpdate};
