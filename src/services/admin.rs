//! Admin operations: doctor management and appointment reporting

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::accounts::validate_password;
use super::views::{
    self, AppointmentView, DoctorAppointmentCount, DoctorView, Parties, PatientAppointmentCount,
};
use super::{required, validate_email, Clinic};
use crate::auth::{hash_password, Claims};
use crate::models::{AppointmentFilter, DoctorEdit, DoctorFilter, DoctorProfile, Identity, Role};
use crate::types::{ClinicError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct AddDoctorRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub specialty: String,
    pub location: String,
}

/// Absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditDoctorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub location: Option<String>,
}

impl EditDoctorRequest {
    fn into_edit(self) -> Result<DoctorEdit> {
        Ok(DoctorEdit {
            name: self.name.map(|v| required("Name", &v)).transpose()?,
            email: self.email.map(|v| validate_email(&v)).transpose()?,
            specialty: self.specialty.map(|v| required("Specialty", &v)).transpose()?,
            location: self.location.map(|v| required("Location", &v)).transpose()?,
        })
    }
}

fn doctor_not_found() -> ClinicError {
    ClinicError::NotFound("Doctor not found".into())
}

impl Clinic {
    pub async fn admin_list_doctors(&self, claims: &Claims) -> Result<Vec<DoctorView>> {
        self.caller(claims, Role::Admin).await?;
        let profiles = self.store.list_doctors(&DoctorFilter::default()).await?;
        views::doctor_views(self.store(), profiles).await
    }

    /// Create a Doctor identity and its profile in one write
    pub async fn admin_add_doctor(
        &self,
        claims: &Claims,
        request: AddDoctorRequest,
    ) -> Result<DoctorView> {
        let admin = self.caller(claims, Role::Admin).await?;

        let name = required("Name", &request.name)?;
        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;
        let specialty = required("Specialty", &request.specialty)?;
        let location = required("Location", &request.location)?;

        if self.store.identity_by_email(&email).await?.is_some() {
            return Err(ClinicError::Validation("Email already exists".into()));
        }

        let identity = Identity::new(Role::Doctor, name, email, hash_password(&request.password)?);
        let profile = DoctorProfile::new(identity.id, specialty, location);

        let view = DoctorView {
            id: profile.id,
            identity_id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            specialty: profile.specialty.clone(),
            location: profile.location.clone(),
        };

        self.store.insert_doctor(identity, profile).await?;

        info!("Admin {} added doctor {} ({})", admin.id(), view.id, view.email);
        Ok(view)
    }

    pub async fn admin_edit_doctor(
        &self,
        claims: &Claims,
        doctor_id: Uuid,
        request: EditDoctorRequest,
    ) -> Result<DoctorView> {
        let admin = self.caller(claims, Role::Admin).await?;
        let edit = request.into_edit()?;

        if !self.store.update_doctor(doctor_id, &edit).await? {
            return Err(doctor_not_found());
        }

        let profile = self
            .store
            .doctor_by_id(doctor_id)
            .await?
            .ok_or_else(doctor_not_found)?;

        info!("Admin {} edited doctor {}", admin.id(), doctor_id);
        views::doctor_views(self.store(), vec![profile])
            .await?
            .pop()
            .ok_or_else(doctor_not_found)
    }

    /// Remove a doctor's profile and identity. Their appointments are kept
    /// and keep pointing at the removed doctor id.
    pub async fn admin_delete_doctor(&self, claims: &Claims, doctor_id: Uuid) -> Result<()> {
        let admin = self.caller(claims, Role::Admin).await?;

        if !self.store.delete_doctor(doctor_id).await? {
            return Err(doctor_not_found());
        }

        info!("Admin {} deleted doctor {}", admin.id(), doctor_id);
        Ok(())
    }

    pub async fn admin_list_appointments(&self, claims: &Claims) -> Result<Vec<AppointmentView>> {
        self.caller(claims, Role::Admin).await?;
        let appointments = self
            .store
            .list_appointments(&AppointmentFilter::default())
            .await?;
        views::appointment_views(self.store(), appointments).await
    }

    pub async fn admin_count_by_doctor(
        &self,
        claims: &Claims,
    ) -> Result<Vec<DoctorAppointmentCount>> {
        self.caller(claims, Role::Admin).await?;
        let appointments = self
            .store
            .list_appointments(&AppointmentFilter::default())
            .await?;
        let parties = Parties::load(self.store(), &appointments).await?;
        Ok(views::count_by_doctor(&appointments, &parties))
    }

    pub async fn admin_count_by_patient(
        &self,
        claims: &Claims,
    ) -> Result<Vec<PatientAppointmentCount>> {
        self.caller(claims, Role::Admin).await?;
        let appointments = self
            .store
            .list_appointments(&AppointmentFilter::default())
            .await?;
        let parties = Parties::load(self.store(), &appointments).await?;
        Ok(views::count_by_patient(&appointments, &parties))
    }
}
