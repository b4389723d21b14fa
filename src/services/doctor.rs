//! Doctor operations. All of them are scoped to the caller's own appointments.

use uuid::Uuid;

use super::views::{self, AppointmentView, PrescriptionView};
use super::Clinic;
use crate::auth::{load_owned_appointment, Claims};
use crate::lifecycle::{self, StatusAction};
use crate::models::{AppointmentFilter, Role};
use crate::types::{ClinicError, Result};

impl Clinic {
    pub async fn doctor_list_appointments(&self, claims: &Claims) -> Result<Vec<AppointmentView>> {
        let caller = self.caller(claims, Role::Doctor).await?;
        let doctor_id = caller
            .doctor
            .as_ref()
            .map(|d| d.id)
            .ok_or_else(|| ClinicError::Authentication("Doctor profile not found".into()))?;

        let appointments = self
            .store
            .list_appointments(&AppointmentFilter::for_doctor(doctor_id))
            .await?;
        views::appointment_views(self.store(), appointments).await
    }

    /// Approve or reject a Pending appointment
    pub async fn doctor_set_status(
        &self,
        claims: &Claims,
        appointment_id: Uuid,
        status: &str,
    ) -> Result<AppointmentView> {
        let caller = self.caller(claims, Role::Doctor).await?;
        let action = StatusAction::from_doctor_decision(status)?;

        let owned = load_owned_appointment(self.store(), &caller, appointment_id).await?;
        let updated = lifecycle::transition(self.store(), owned, action).await?;

        views::appointment_view(self.store(), updated).await
    }

    pub async fn doctor_add_prescription(
        &self,
        claims: &Claims,
        appointment_id: Uuid,
        notes: &str,
    ) -> Result<PrescriptionView> {
        let caller = self.caller(claims, Role::Doctor).await?;

        let owned = load_owned_appointment(self.store(), &caller, appointment_id).await?;
        let prescription = lifecycle::attach_prescription(self.store(), &owned, notes).await?;

        Ok(PrescriptionView {
            id: prescription.id,
            appointment_id: prescription.appointment_id,
            notes: prescription.notes,
            created_at: prescription.created_at,
            scheduled_at: Some(owned.appointment().scheduled_at),
            doctor_name: Some(caller.identity.name),
        })
    }
}
