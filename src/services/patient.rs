//! Patient operations: doctor discovery, booking, cancellation, prescriptions

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::views::{self, AppointmentView, DoctorView, PrescriptionView};
use super::{required, Clinic};
use crate::auth::{load_owned_appointment, Claims};
use crate::lifecycle::{self, StatusAction};
use crate::models::{Appointment, AppointmentFilter, DoctorFilter, Role};
use crate::types::{ClinicError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    #[serde(alias = "appointmentDate")]
    pub scheduled_at: DateTime<Utc>,
}

impl Clinic {
    pub async fn patient_list_doctors(&self, claims: &Claims) -> Result<Vec<DoctorView>> {
        self.caller(claims, Role::Patient).await?;
        self.find_doctors(DoctorFilter::default()).await
    }

    pub async fn patient_search_by_specialty(
        &self,
        claims: &Claims,
        specialty: &str,
    ) -> Result<Vec<DoctorView>> {
        self.caller(claims, Role::Patient).await?;
        let specialty = required("Specialty", specialty)?;
        self.find_doctors(DoctorFilter {
            specialty: Some(specialty),
            location: None,
        })
        .await
    }

    pub async fn patient_search_by_location(
        &self,
        claims: &Claims,
        location: &str,
    ) -> Result<Vec<DoctorView>> {
        self.caller(claims, Role::Patient).await?;
        let location = required("Location", location)?;
        self.find_doctors(DoctorFilter {
            specialty: None,
            location: Some(location),
        })
        .await
    }

    async fn find_doctors(&self, filter: DoctorFilter) -> Result<Vec<DoctorView>> {
        let profiles = self.store.list_doctors(&filter).await?;
        views::doctor_views(self.store(), profiles).await
    }

    /// Book with a doctor; the new appointment starts Pending
    pub async fn patient_book_appointment(
        &self,
        claims: &Claims,
        request: BookAppointmentRequest,
    ) -> Result<AppointmentView> {
        let caller = self.caller(claims, Role::Patient).await?;

        let doctor = self
            .store
            .doctor_by_id(request.doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;

        let appointment =
            Appointment::book(caller.id(), doctor.id, request.scheduled_at, Utc::now());
        self.store.insert_appointment(appointment.clone()).await?;

        info!(
            "Patient {} booked appointment {} with doctor {}",
            caller.id(),
            appointment.id,
            doctor.id
        );
        views::appointment_view(self.store(), appointment).await
    }

    pub async fn patient_list_appointments(
        &self,
        claims: &Claims,
    ) -> Result<Vec<AppointmentView>> {
        let caller = self.caller(claims, Role::Patient).await?;
        let appointments = self
            .store
            .list_appointments(&AppointmentFilter::for_patient(caller.id()))
            .await?;
        views::appointment_views(self.store(), appointments).await
    }

    pub async fn patient_cancel(
        &self,
        claims: &Claims,
        appointment_id: Uuid,
    ) -> Result<AppointmentView> {
        let caller = self.caller(claims, Role::Patient).await?;

        let owned = load_owned_appointment(self.store(), &caller, appointment_id).await?;
        let updated = lifecycle::transition(self.store(), owned, StatusAction::Cancel).await?;

        views::appointment_view(self.store(), updated).await
    }

    pub async fn patient_list_prescriptions(
        &self,
        claims: &Claims,
    ) -> Result<Vec<PrescriptionView>> {
        let caller = self.caller(claims, Role::Patient).await?;

        let appointments = self
            .store
            .list_appointments(&AppointmentFilter::for_patient(caller.id()))
            .await?;
        let ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();
        let prescriptions = self.store.prescriptions_for(&ids).await?;

        views::prescription_views(self.store(), &appointments, prescriptions).await
    }
}
