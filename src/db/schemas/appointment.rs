//! Appointment document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{parse_id, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::models::{Appointment, AppointmentStatus};
use crate::types::ClinicError;

/// Collection name for appointments
pub const APPOINTMENT_COLLECTION: &str = "appointments";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AppointmentDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Identity id of the patient
    pub patient_id: String,

    /// Doctor profile id; may outlive the doctor
    pub doctor_id: String,

    pub scheduled_at: bson::DateTime,

    pub status: AppointmentStatus,

    pub created_at: bson::DateTime,
}

impl From<Appointment> for AppointmentDoc {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id.to_string(),
            metadata: Metadata::new(),
            patient_id: appointment.patient_id.to_string(),
            doctor_id: appointment.doctor_id.to_string(),
            scheduled_at: bson::DateTime::from_chrono(appointment.scheduled_at),
            status: appointment.status,
            created_at: bson::DateTime::from_chrono(appointment.created_at),
        }
    }
}

impl TryFrom<AppointmentDoc> for Appointment {
    type Error = ClinicError;

    fn try_from(doc: AppointmentDoc) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: parse_id("appointment id", &doc.id)?,
            patient_id: parse_id("patient id", &doc.patient_id)?,
            doctor_id: parse_id("doctor id", &doc.doctor_id)?,
            scheduled_at: doc.scheduled_at.to_chrono(),
            status: doc.status,
            created_at: doc.created_at.to_chrono(),
        })
    }
}

impl IntoIndexes for AppointmentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "patient_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("patient_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "doctor_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("doctor_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AppointmentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_status_stored_by_name() {
        let appointment = Appointment::book(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc.with_ymd_and_hms(2030, 1, 2, 9, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2029, 12, 1, 0, 0, 0).unwrap(),
        );
        let doc = AppointmentDoc::from(appointment.clone());
        let raw = bson::to_document(&doc).unwrap();
        assert_eq!(raw.get_str("status").unwrap(), "Pending");

        let back = Appointment::try_from(doc).unwrap();
        assert_eq!(back, appointment);
    }

    #[test]
    fn test_booked_times_read_back_unchanged() {
        let now = Utc::now();
        let appointment = Appointment::book(Uuid::new_v4(), Uuid::new_v4(), now, now);
        let back = Appointment::try_from(AppointmentDoc::from(appointment.clone())).unwrap();
        assert_eq!(back.scheduled_at, appointment.scheduled_at);
        assert_eq!(back.created_at, appointment.created_at);
    }
}
