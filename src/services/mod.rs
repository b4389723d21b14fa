//! Clinic operations
//!
//! [`Clinic`] is the single entry point the transport layer calls. Each
//! protected operation takes verified [`Claims`] and runs the authorization
//! guard before touching any record.
//!
//! Operations are grouped by actor:
//! - `accounts` - register, login, bootstrap admin (public)
//! - `admin` - doctor management and reporting
//! - `doctor` - own appointments, status decisions, prescriptions
//! - `patient` - doctor discovery, booking, cancellation, prescriptions

mod accounts;
mod admin;
mod doctor;
mod patient;
mod views;

pub use accounts::{LoginRequest, RegisterRequest, MIN_PASSWORD_LEN};
pub use admin::{AddDoctorRequest, EditDoctorRequest};
pub use patient::BookAppointmentRequest;
pub use views::{
    AppointmentView, AuthResponse, DoctorAppointmentCount, DoctorView, PartyView,
    PatientAppointmentCount, PrescriptionView, RegisteredIdentity,
};

use std::sync::Arc;

use crate::auth::{authorize, extract_token_from_header, Caller, Claims, JwtValidator};
use crate::models::Role;
use crate::store::ClinicStore;
use crate::types::{ClinicError, Result};

/// Behaviour switches that are not part of the signing configuration
#[derive(Debug, Clone, Default)]
pub struct ClinicConfig {
    /// Allow `register` with role Admin
    pub allow_admin_registration: bool,
}

/// The clinic service: store + token validator + policy
#[derive(Clone)]
pub struct Clinic {
    store: Arc<dyn ClinicStore>,
    jwt: JwtValidator,
    config: ClinicConfig,
}

impl Clinic {
    pub fn new(store: Arc<dyn ClinicStore>, jwt: JwtValidator, config: ClinicConfig) -> Self {
        Self { store, jwt, config }
    }

    pub fn store(&self) -> &dyn ClinicStore {
        self.store.as_ref()
    }

    /// Verify the bearer token from an Authorization header value
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<Claims> {
        let token = extract_token_from_header(auth_header)
            .ok_or_else(|| ClinicError::Authentication("No bearer token provided".into()))?;
        self.jwt.verify_token(token)
    }

    async fn caller(&self, claims: &Claims, role: Role) -> Result<Caller> {
        authorize(self.store(), claims, role).await
    }
}

/// Trimmed value of a required text field
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClinicError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

pub(crate) fn validate_email(email: &str) -> Result<String> {
    let email = required("Email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(' ') => {
            Ok(email)
        }
        _ => Err(ClinicError::Validation(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}
