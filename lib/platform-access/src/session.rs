//! Session controller for the signed-in staff member.
//!
//! The controller owns the observable session state and routes every
//! session-affecting operation (login, registration, silent verification,
//! profile update, logout) through the [`ApiClient`]. It is created once per
//! process and handed to whatever needs it; there is no ambient global.
//!
//! State transitions:
//!
//! ```text
//! unauthenticated --login/register/initialize--> authenticating
//! authenticating  --profile returned-----------> authenticated
//! authenticating  --failure--------------------> error
//! authenticating  --failure, already signed in-> authenticated
//! authenticated   --update_profile-------------> authenticating
//! authenticated   --logout / session expiry----> unauthenticated
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::auth::{LoginCredentials, Registration, RegistrationReceipt};
use crate::client::{ApiClient, ApiRequest, ApiResponse};
use crate::error::{ApiError, SESSION_EXPIRED_MESSAGE, SessionError};
use crate::role::Role;
use crate::user::{Profile, ProfileUpdate};

/// Where the session controller sends the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRoutes {
    /// Sign-in page, used after logout and session expiry.
    pub sign_in: String,
    /// Protected home page, used after login.
    pub home: String,
}

impl Default for SessionRoutes {
    fn default() -> Self {
        Self {
            sign_in: "/signin".to_string(),
            home: "/dashboard".to_string(),
        }
    }
}

/// Page navigation requested by the controller.
///
/// Implemented by the UI layer; the controller never renders anything.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for headless embedders that have nowhere to go.
#[derive(Debug, Default, Clone, Copy)]
pub struct StayPut;

impl Navigator for StayPut {
    fn navigate(&self, _path: &str) {}
}

/// Coarse session status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Error,
}

/// Observable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    /// In-memory profile mirror.
    pub user: Option<Profile>,
    /// Message from the last failed attempt, kept until the next one.
    pub error: Option<String>,
}

/// Process-wide session state machine.
pub struct SessionController {
    client: ApiClient,
    navigator: Arc<dyn Navigator>,
    routes: SessionRoutes,
    state: watch::Sender<SessionState>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("routes", &self.routes)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates the controller, restoring in-memory state from the store.
    ///
    /// A cached profile is only restored when an access token is stored next
    /// to it.
    #[must_use]
    pub fn new(client: ApiClient, navigator: Arc<dyn Navigator>, routes: SessionRoutes) -> Self {
        let stored = client.store().get();
        let initial = match stored.profile {
            Some(profile) if stored.has_access_token() => SessionState {
                status: SessionStatus::Authenticated,
                user: Some(profile),
                error: None,
            },
            _ => SessionState::default(),
        };

        Self {
            client,
            navigator,
            routes,
            state: watch::Sender::new(initial),
            initialized: AtomicBool::new(false),
        }
    }

    /// Returns the underlying API client.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Performs the start-up silent verification, once per controller.
    ///
    /// Runs only when an access token is stored and no profile is loaded.
    /// A failed verification ends the session exactly like a logout.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionStatus {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return self.status();
        }

        let stored = self.client.store().get();
        if !stored.has_access_token() || self.state.borrow().user.is_some() {
            return self.status();
        }

        self.begin();
        match self.client.verify().await.result {
            Ok(Some(user)) => {
                info!(user_id = %user.id(), "Session restored");
                self.establish(user);
            }
            Ok(None) => {
                warn!("Verification returned no profile; ending session");
                self.end_session(None);
                self.navigator.navigate(&self.routes.sign_in);
            }
            Err(e) => {
                warn!(error = %e, "Stored credentials could not be verified; ending session");
                self.end_session(None);
                self.navigator.navigate(&self.routes.sign_in);
            }
        }

        self.status()
    }

    /// Signs in and navigates to the protected home page.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Profile, SessionError> {
        self.begin();

        match self.client.login(credentials).await.result {
            Ok(Some(user)) => {
                self.establish(user.clone());
                self.navigator.navigate(&self.routes.home);
                Ok(user)
            }
            Ok(None) => self.fail(SessionError::MissingProfile),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Creates an account. The new account is not signed in.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Option<RegistrationReceipt>, SessionError> {
        self.begin();

        match self.client.register(registration).await.result {
            Ok(receipt) => {
                self.state.send_modify(|state| {
                    state.status = if state.user.is_some() {
                        SessionStatus::Authenticated
                    } else {
                        SessionStatus::Unauthenticated
                    };
                    state.error = None;
                });
                info!("Account registered");
                Ok(receipt)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Updates the signed-in user's profile.
    ///
    /// Identity and role are never taken from the response. On failure the
    /// session stays signed in and the message is retained.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, SessionError> {
        let Some(current) = self.user() else {
            return Err(SessionError::NotAuthenticated);
        };
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        self.begin();
        match self.client.update_profile(update).await.result {
            Ok(Some(returned)) => {
                let merged = current.merge(returned);
                self.establish(merged.clone());
                Ok(merged)
            }
            Ok(None) => self.keep_with_error(SessionError::MissingProfile),
            Err(e) if e.is_session_expired() => {
                self.expire();
                Err(e.into())
            }
            Err(e) => self.keep_with_error(e.into()),
        }
    }

    /// Ends the session locally, whatever the backend answers.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if self.client.store().get().has_access_token() {
            if let Err(e) = self.client.logout().await.result {
                warn!(error = %e, "Remote logout failed; clearing local session anyway");
            }
        }

        self.end_session(None);
        info!("Signed out");
        self.navigator.navigate(&self.routes.sign_in);
    }

    /// Performs an authenticated call on behalf of the UI.
    ///
    /// A session-expired outcome signs the user out and sends them to the
    /// sign-in page once, however many calls observed the expiry.
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResponse<T> {
        let response = self.client.execute(request).await;
        if response.error().is_some_and(ApiError::is_session_expired) {
            self.expire();
        }
        response
    }

    /// True iff a profile is loaded and an access token is stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some() && self.client.store().get().has_access_token()
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.state
            .borrow()
            .user
            .as_ref()
            .is_some_and(|user| user.has_role(role))
    }

    /// Exact membership in the loaded profile's permission set.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.state
            .borrow()
            .user
            .as_ref()
            .is_some_and(|user| user.has_permission(permission))
    }

    #[must_use]
    pub fn user(&self) -> Option<Profile> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    /// Returns a snapshot of the session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribes to session state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.status = SessionStatus::Authenticating;
            state.error = None;
        });
    }

    fn establish(&self, user: Profile) {
        self.client.store().set_profile(user.clone());
        self.state.send_replace(SessionState {
            status: SessionStatus::Authenticated,
            user: Some(user),
            error: None,
        });
    }

    /// Records a failed login or registration. A signed-in user stays signed
    /// in, matching the credentials still held by the store.
    fn fail<T>(&self, err: SessionError) -> Result<T, SessionError> {
        warn!(error = %err, "Authentication attempt failed");
        self.state.send_modify(|state| {
            state.status = if state.user.is_some() {
                SessionStatus::Authenticated
            } else {
                SessionStatus::Error
            };
            state.error = Some(err.message());
        });
        Err(err)
    }

    fn keep_with_error<T>(&self, err: SessionError) -> Result<T, SessionError> {
        warn!(error = %err, "Profile update failed");
        self.state.send_modify(|state| {
            state.status = if state.user.is_some() {
                SessionStatus::Authenticated
            } else {
                SessionStatus::Unauthenticated
            };
            state.error = Some(err.message());
        });
        Err(err)
    }

    fn expire(&self) {
        if self.end_session(Some(SESSION_EXPIRED_MESSAGE.to_string())) {
            info!("Session expired");
            self.navigator.navigate(&self.routes.sign_in);
        }
    }

    /// Clears the store and resets state. Returns true if a session was active.
    fn end_session(&self, notice: Option<String>) -> bool {
        self.client.store().clear();
        self.state.send_if_modified(|state| {
            let was_active =
                state.user.is_some() || state.status != SessionStatus::Unauthenticated;
            *state = SessionState {
                status: SessionStatus::Unauthenticated,
                user: None,
                error: notice,
            };
            was_active
        })
    }
}
