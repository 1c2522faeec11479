//! Staff profile as returned by the clinic backend.
//!
//! The profile is the cached identity, role and permission record of the
//! signed-in staff member. It is received from login, verify and profile
//! update calls and mirrored into the credential store.

use chrono::{DateTime, Utc};
use clinic_portal_core::{ClinicId, UserId};
use serde::{Deserialize, Serialize};

use crate::role::{NO_PERMISSIONS, PermissionSet, Role};

/// The signed-in staff member's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Backend identifier of the staff account.
    id: UserId,
    /// Role within the clinic.
    role: Role,
    /// Permission strings granted to the account. Absent when the backend
    /// omitted them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    permissions: Option<PermissionSet>,
    /// Login email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    /// Clinic the account belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clinic_id: Option<ClinicId>,
    /// When the account was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Creates a profile with only identity and role set.
    #[must_use]
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            permissions: None,
            email: None,
            full_name: None,
            phone: None,
            clinic_id: None,
            created_at: None,
        }
    }

    /// Sets the permission set.
    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Sets the clinic.
    #[must_use]
    pub fn with_clinic(mut self, clinic_id: ClinicId) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        self.permissions.as_ref().unwrap_or(&NO_PERMISSIONS)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    #[must_use]
    pub fn clinic_id(&self) -> Option<&ClinicId> {
        self.clinic_id.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns true if the profile has the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Returns true if the exact permission string is granted.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().contains(permission)
    }

    /// Merges a profile returned by an update call into this one.
    ///
    /// Identity and role always come from `self`. Fields the backend
    /// omitted, permissions included, keep their current value.
    #[must_use]
    pub fn merge(self, updated: Profile) -> Self {
        Self {
            id: self.id,
            role: self.role,
            permissions: updated.permissions.or(self.permissions),
            email: updated.email.or(self.email),
            full_name: updated.full_name.or(self.full_name),
            phone: updated.phone.or(self.phone),
            clinic_id: updated.clinic_id.or(self.clinic_id),
            created_at: updated.created_at.or(self.created_at),
        }
    }
}

/// Partial profile sent to the profile update endpoint.
///
/// Only fields that are set are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    /// Returns true if no field would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none() && self.phone.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn therapist() -> Profile {
        Profile::new(UserId::new("u-1"), Role::Physiotherapist)
            .with_email("ana@clinic.example")
            .with_full_name("Ana Costa")
            .with_permissions(["patients:read"].into_iter().collect())
    }

    #[test]
    fn deserializes_backend_profile() {
        let json = r#"{
            "id": 12,
            "role": "manager",
            "permissions": ["reports:view", "appointments:write"],
            "email": "m@clinic.example",
            "fullName": "Marta Silva",
            "clinicId": "c-9",
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;

        let profile: Profile = serde_json::from_str(json).expect("deserialize");
        assert_eq!(profile.id().as_str(), "12");
        assert_eq!(profile.role(), Role::Manager);
        assert!(profile.has_permission("reports:view"));
        assert_eq!(profile.full_name(), Some("Marta Silva"));
        assert_eq!(profile.clinic_id().map(ClinicId::as_str), Some("c-9"));
        assert!(profile.created_at().is_some());
    }

    #[test]
    fn missing_permissions_default_to_empty() {
        let profile: Profile =
            serde_json::from_str(r#"{"id":"u-2","role":"assistant"}"#).expect("deserialize");
        assert!(profile.permissions().is_empty());
        assert!(profile.email().is_none());
    }

    #[test]
    fn has_role_checks_exact_role() {
        let profile = therapist();
        assert!(profile.has_role(Role::Physiotherapist));
        assert!(!profile.has_role(Role::Admin));
    }

    #[test]
    fn merge_preserves_identity_and_role() {
        let current = therapist();
        let returned = Profile::new(UserId::new("someone-else"), Role::Admin)
            .with_full_name("Ana C. Costa")
            .with_permissions(["patients:read", "patients:write"].into_iter().collect());

        let merged = current.merge(returned);

        assert_eq!(merged.id().as_str(), "u-1");
        assert_eq!(merged.role(), Role::Physiotherapist);
        assert_eq!(merged.full_name(), Some("Ana C. Costa"));
        assert_eq!(merged.email(), Some("ana@clinic.example"));
        assert!(merged.has_permission("patients:write"));
    }

    #[test]
    fn merge_keeps_permissions_the_backend_omitted() {
        let returned: Profile =
            serde_json::from_str(r#"{"id":"u-1","role":"physiotherapist","fullName":"Ana"}"#)
                .expect("deserialize");

        let merged = therapist().merge(returned);

        assert!(merged.has_permission("patients:read"));
        assert_eq!(merged.full_name(), Some("Ana"));
    }

    #[test]
    fn merge_accepts_explicitly_empty_permissions() {
        let returned: Profile = serde_json::from_str(
            r#"{"id":"u-1","role":"physiotherapist","permissions":[]}"#,
        )
        .expect("deserialize");

        let merged = therapist().merge(returned);

        assert!(merged.permissions().is_empty());
    }

    #[test]
    fn profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            phone: Some("+351 900 000 000".to_string()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_string(&update).expect("serialize");
        assert_eq!(json, r#"{"phone":"+351 900 000 000"}"#);
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }
}
