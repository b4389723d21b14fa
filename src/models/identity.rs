//! Identities, roles and doctor profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::now_millis;
use crate::types::ClinicError;

/// Actor role. Closed set; every authorization check matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Doctor => "Doctor",
            Role::Patient => "Patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClinicError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Admin" => Ok(Role::Admin),
            "Doctor" => Ok(Role::Doctor),
            "Patient" => Ok(Role::Patient),
            other => Err(ClinicError::Validation(format!(
                "Unknown role '{}'. Use 'Admin', 'Doctor' or 'Patient'",
                other
            ))),
        }
    }
}

/// A user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    /// Normalized (trimmed, lower-cased); unique across live identities
    pub email: String,
    /// Argon2 PHC string, or a legacy base64 SHA-256 digest
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(role: Role, name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            name,
            email: normalize_email(&email),
            password_hash,
            created_at: now_millis(),
        }
    }
}

/// Doctor-specific data, owned 1:1 by an identity with role Doctor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub specialty: String,
    pub location: String,
}

impl DoctorProfile {
    pub fn new(identity_id: Uuid, specialty: String, location: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            specialty,
            location,
        }
    }
}

/// Partial update applied by admin edit-doctor. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub location: Option<String>,
}

impl DoctorEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.specialty.is_none()
            && self.location.is_none()
    }
}

/// Filter for doctor scans. Terms are matched case-insensitively as substrings.
#[derive(Debug, Clone, Default)]
pub struct DoctorFilter {
    pub specialty: Option<String>,
    pub location: Option<String>,
}

impl DoctorFilter {
    pub fn matches(&self, profile: &DoctorProfile) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle {
                Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
                None => true,
            }
        }

        contains(&profile.specialty, &self.specialty) && contains(&profile.location, &self.location)
    }
}

/// Canonical form used for storage and uniqueness checks
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_closed() {
        assert_eq!("Patient".parse::<Role>().unwrap(), Role::Patient);
        assert_eq!(" Doctor ".parse::<Role>().unwrap(), Role::Doctor);
        assert!("patient".parse::<Role>().is_err());
        assert!("Nurse".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_as_name() {
        assert_eq!(serde_json::to_string(&Role::Patient).unwrap(), "\"Patient\"");
    }

    #[test]
    fn test_email_normalized() {
        let identity = Identity::new(
            Role::Patient,
            "Ann".into(),
            "  Ann@Example.COM ".into(),
            "hash".into(),
        );
        assert_eq!(identity.email, "ann@example.com");
    }

    #[test]
    fn test_doctor_filter() {
        let profile = DoctorProfile::new(Uuid::new_v4(), "Cardiology".into(), "North Wing".into());

        assert!(DoctorFilter::default().matches(&profile));
        assert!(DoctorFilter {
            specialty: Some("cardio".into()),
            location: None
        }
        .matches(&profile));
        assert!(DoctorFilter {
            specialty: None,
            location: Some("WING".into())
        }
        .matches(&profile));
        assert!(!DoctorFilter {
            specialty: Some("derm".into()),
            location: None
        }
        .matches(&profile));
    }
}
