//! Prescription document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{parse_id, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::models::Prescription;
use crate::types::ClinicError;

/// Collection name for prescriptions
pub const PRESCRIPTION_COLLECTION: &str = "prescriptions";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PrescriptionDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub appointment_id: String,

    pub notes: String,

    pub created_at: bson::DateTime,
}

impl From<Prescription> for PrescriptionDoc {
    fn from(prescription: Prescription) -> Self {
        Self {
            id: prescription.id.to_string(),
            metadata: Metadata::new(),
            appointment_id: prescription.appointment_id.to_string(),
            notes: prescription.notes,
            created_at: bson::DateTime::from_chrono(prescription.created_at),
        }
    }
}

impl TryFrom<PrescriptionDoc> for Prescription {
    type Error = ClinicError;

    fn try_from(doc: PrescriptionDoc) -> Result<Self, Self::Error> {
        Ok(Prescription {
            id: parse_id("prescription id", &doc.id)?,
            appointment_id: parse_id("appointment id", &doc.appointment_id)?,
            notes: doc.notes,
            created_at: doc.created_at.to_chrono(),
        })
    }
}

impl IntoIndexes for PrescriptionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one prescription per appointment
            (
                doc! { "appointment_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("appointment_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PrescriptionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
