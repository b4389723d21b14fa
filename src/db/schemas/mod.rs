//! MongoDB document schemas for identities, appointments and prescriptions
//!
//! Ids are stored as hyphenated UUID strings so they match what the API
//! hands out.

mod appointment;
mod identity;
mod metadata;
mod prescription;

pub use appointment::{AppointmentDoc, APPOINTMENT_COLLECTION};
pub use identity::{DoctorDoc, IdentityDoc, IDENTITY_COLLECTION};
pub use metadata::Metadata;
pub use prescription::{PrescriptionDoc, PRESCRIPTION_COLLECTION};

use uuid::Uuid;

use crate::types::ClinicError;

pub(crate) fn parse_id(field: &str, value: &str) -> Result<Uuid, ClinicError> {
    Uuid::parse_str(value)
        .map_err(|e| ClinicError::Database(format!("Stored {} '{}' is not a UUID: {}", field, value, e)))
}
