//! Record store abstraction
//!
//! The clinic core only talks to persistence through [`ClinicStore`]. Two
//! implementations exist: [`MemoryStore`] for tests and dev mode, and
//! `crate::db::MongoStore` for production.
//!
//! Contract shared by every implementation:
//! - Email uniqueness is enforced on insert and update (`Validation`).
//! - `insert_doctor` writes the identity and its profile atomically.
//! - `delete_doctor` removes the profile and its identity together and
//!   leaves appointments in place.
//! - `update_status_if` is a compare-and-set on the appointment status.
//! - `insert_prescription` rejects a second prescription for the same
//!   appointment (`Conflict`).

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, DoctorEdit, DoctorFilter, DoctorProfile,
    Identity, Prescription,
};
use crate::types::Result;

#[async_trait]
pub trait ClinicStore: Send + Sync {
    // Identities

    async fn insert_identity(&self, identity: Identity) -> Result<()>;

    async fn identity_by_id(&self, id: Uuid) -> Result<Option<Identity>>;

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>>;

    async fn identities_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Identity>>;

    async fn update_password_hash(&self, id: Uuid, password_hash: String) -> Result<()>;

    // Doctors

    async fn insert_doctor(&self, identity: Identity, profile: DoctorProfile) -> Result<()>;

    async fn doctor_by_id(&self, id: Uuid) -> Result<Option<DoctorProfile>>;

    async fn doctor_by_identity(&self, identity_id: Uuid) -> Result<Option<DoctorProfile>>;

    async fn doctors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<DoctorProfile>>;

    async fn list_doctors(&self, filter: &DoctorFilter) -> Result<Vec<DoctorProfile>>;

    /// Returns false when no such doctor exists
    async fn update_doctor(&self, id: Uuid, edit: &DoctorEdit) -> Result<bool>;

    /// Returns false when no such doctor exists
    async fn delete_doctor(&self, id: Uuid) -> Result<bool>;

    // Appointments

    async fn insert_appointment(&self, appointment: Appointment) -> Result<()>;

    async fn appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>>;

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;

    /// Set `status` to `next` only if it is still `expected`.
    /// Returns false when the appointment is missing or its status moved on.
    async fn update_status_if(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<bool>;

    // Prescriptions

    async fn insert_prescription(&self, prescription: Prescription) -> Result<()>;

    async fn prescription_for(&self, appointment_id: Uuid) -> Result<Option<Prescription>>;

    async fn prescriptions_for(&self, appointment_ids: &[Uuid]) -> Result<Vec<Prescription>>;
}
