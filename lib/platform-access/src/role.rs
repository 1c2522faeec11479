//! Role and permission types for clinic staff.
//!
//! Every staff account carries exactly one role and a flat set of
//! permission strings issued by the backend. The portal never derives
//! permissions from roles; both are taken verbatim from the profile.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Staff role within a clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control over the clinic account.
    Admin,
    /// Runs day-to-day operations and reporting.
    Manager,
    /// Treats patients and writes clinical documentation.
    Physiotherapist,
    /// Handles scheduling and patient intake.
    Receptionist,
    /// Supports physiotherapists during sessions.
    Assistant,
}

impl Role {
    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Physiotherapist => "physiotherapist",
            Self::Receptionist => "receptionist",
            Self::Assistant => "assistant",
        }
    }

    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared empty set, returned for profiles without permissions.
pub(crate) static NO_PERMISSIONS: PermissionSet = PermissionSet {
    permissions: BTreeSet::new(),
};

/// Set of permission strings granted to a staff account.
///
/// Membership is exact string comparison; there is no wildcard or
/// hierarchy handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    permissions: BTreeSet<String>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true if the exact permission string is granted.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Returns the number of granted permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns true if no permissions are granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Iterates over the granted permissions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().map(Into::into).collect(),
        }
    }
}
