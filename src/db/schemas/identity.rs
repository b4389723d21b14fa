//! Identity document schema
//!
//! A doctor's profile is embedded in its identity document, so creating or
//! removing a doctor is a single-document write.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{parse_id, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::models::{DoctorProfile, Identity, Role};
use crate::types::ClinicError;

/// Collection name for identities
pub const IDENTITY_COLLECTION: &str = "identities";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IdentityDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub role: Role,

    pub name: String,

    /// Normalized email
    pub email: String,

    /// Argon2 PHC string or legacy digest
    pub password_hash: String,

    pub created_at: bson::DateTime,

    /// Present only for role Doctor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorDoc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DoctorDoc {
    pub id: String,
    pub specialty: String,
    pub location: String,
}

impl IdentityDoc {
    pub fn new(identity: Identity, profile: Option<DoctorProfile>) -> Self {
        Self {
            id: identity.id.to_string(),
            metadata: Metadata::new(),
            role: identity.role,
            name: identity.name,
            email: identity.email,
            password_hash: identity.password_hash,
            created_at: bson::DateTime::from_chrono(identity.created_at),
            doctor: profile.map(|p| DoctorDoc {
                id: p.id.to_string(),
                specialty: p.specialty,
                location: p.location,
            }),
        }
    }

    pub fn to_identity(&self) -> Result<Identity, ClinicError> {
        Ok(Identity {
            id: parse_id("identity id", &self.id)?,
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            created_at: self.created_at.to_chrono(),
        })
    }

    /// The embedded doctor profile, if any
    pub fn to_profile(&self) -> Result<Option<DoctorProfile>, ClinicError> {
        match &self.doctor {
            Some(doctor) => Ok(Some(DoctorProfile {
                id: parse_id("doctor id", &doctor.id)?,
                identity_id: parse_id("identity id", &self.id)?,
                specialty: doctor.specialty.clone(),
                location: doctor.location.clone(),
            })),
            None => Ok(None),
        }
    }
}

impl IntoIndexes for IdentityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Email is unique among live identities only
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! { "metadata.is_deleted": false })
                        .name("email_unique_live".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "doctor.id": 1 },
                Some(
                    IndexOptions::builder()
                        .sparse(true)
                        .name("doctor_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for IdentityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_round_trip_keeps_ids() {
        let identity = Identity::new(
            Role::Doctor,
            "Dr. Ng".into(),
            "ng@x.com".into(),
            "hash".into(),
        );
        let profile = DoctorProfile::new(identity.id, "Cardiology".into(), "Oslo".into());
        let doc = IdentityDoc::new(identity.clone(), Some(profile.clone()));

        let back = doc.to_identity().unwrap();
        assert_eq!(back.id, identity.id);
        assert_eq!(back.email, "ng@x.com");
        assert_eq!(doc.to_profile().unwrap(), Some(profile));
    }

    #[test]
    fn test_corrupt_id_is_database_error() {
        let identity = Identity::new(Role::Patient, "P".into(), "p@x.com".into(), "h".into());
        let mut doc = IdentityDoc::new(identity, None);
        doc.id = "not-a-uuid".into();
        assert!(matches!(doc.to_identity(), Err(ClinicError::Database(_))));
    }
}
