//! Durable client-side credential storage.
//!
//! The credential store is the single owner of the durable access token,
//! refresh token and cached profile. Every other component reads and writes
//! credentials through the [`CredentialStore`] trait. Individual reads and
//! writes are atomic; there is no cross-operation locking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::user::Profile;

/// Access and refresh tokens issued together by the backend.
///
/// Both tokens are opaque; the portal never decodes them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Everything the store holds: three named slots.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, rename = "user", skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl StoredCredentials {
    /// Returns true if an access token is stored.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.profile.is_none()
    }

    fn apply(&mut self, pair: CredentialPair, profile: Option<Profile>) {
        self.access_token = Some(pair.access_token);
        self.refresh_token = Some(pair.refresh_token);
        if let Some(profile) = profile {
            self.profile = Some(profile);
        }
    }
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("profile", &self.profile)
            .finish()
    }
}

/// Holder of the durable credential pair and cached profile.
///
/// Writes cannot fail from the caller's point of view: a storage medium that
/// refuses writes is an environment problem and is logged, not returned.
pub trait CredentialStore: Send + Sync {
    /// Returns the current contents. Never fails.
    fn get(&self) -> StoredCredentials;

    /// Overwrites both tokens, and the cached profile when one is given.
    fn set(&self, pair: CredentialPair, profile: Option<Profile>);

    /// Overwrites only the cached profile.
    fn set_profile(&self, profile: Profile);

    /// Removes tokens and profile. Idempotent.
    fn clear(&self);
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: RwLock<StoredCredentials>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given contents.
    #[must_use]
    pub fn with_contents(contents: StoredCredentials) -> Self {
        Self {
            slots: RwLock::new(contents),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> StoredCredentials {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, pair: CredentialPair, profile: Option<Profile>) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(pair, profile);
    }

    fn set_profile(&self, profile: Profile) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .profile = Some(profile);
    }

    fn clear(&self) {
        *self.slots.write().unwrap_or_else(PoisonError::into_inner) = StoredCredentials::default();
    }
}

/// Credential store backed by a JSON file.
///
/// The file is read once when the store is opened; afterwards the in-memory
/// copy is authoritative and every write is flushed through. Writes go to a
/// sibling temporary file that is renamed over the original.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    slots: RwLock<StoredCredentials>,
}

impl FileCredentialStore {
    /// Opens the store at `path`, loading any existing contents.
    ///
    /// A missing file is an empty store. A file that cannot be parsed is
    /// logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the file
    /// exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> clinic_portal_core::Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir {
                    path: parent.display().to_string(),
                    details: e.to_string(),
                })?;
            }
        }

        let contents = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable credential file"
                );
                StoredCredentials::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => StoredCredentials::default(),
            Err(e) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    details: e.to_string(),
                }
                .into());
            }
        };

        debug!(
            path = %path.display(),
            has_access_token = contents.has_access_token(),
            "Opened credential store"
        );

        Ok(Self {
            path,
            slots: RwLock::new(contents),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, contents: &StoredCredentials) {
        let result = if contents.is_empty() {
            match fs::remove_file(&self.path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        } else {
            self.write_atomically(contents)
        };

        if let Err(e) = result {
            error!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist credentials"
            );
        }
    }

    fn write_atomically(&self, contents: &StoredCredentials) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(contents).map_err(io::Error::other)?;
        let staging = self.staging_path();
        fs::write(&staging, json)?;
        fs::rename(&staging, &self.path)
    }

    /// Sibling of the credential file with `.tmp` appended to the full name.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn update(&self, change: impl FnOnce(&mut StoredCredentials)) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut slots);
        self.persist(&slots);
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> StoredCredentials {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, pair: CredentialPair, profile: Option<Profile>) {
        self.update(|slots| slots.apply(pair, profile));
    }

    fn set_profile(&self, profile: Profile) {
        self.update(|slots| slots.profile = Some(profile));
    }

    fn clear(&self) {
        self.update(|slots| *slots = StoredCredentials::default());
    }
}
