//! Authorization guard
//!
//! Decides allow/deny for a verified claim set. The caller is re-resolved
//! from the store on every call; nothing embedded in the token beyond the
//! subject id and role is trusted.
//!
//! Ownership failures are reported as `NotFound`, identical to a missing
//! resource, so callers cannot probe for records owned by someone else.

use std::fmt;
use tracing::warn;
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::{Appointment, DoctorProfile, Identity, Role};
use crate::store::ClinicStore;
use crate::types::{ClinicError, Result};

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deny {
    ForbiddenRole { required: Role, actual: Role },
    StaleCredential,
    NotResourceOwner { resource: &'static str },
}

impl fmt::Display for Deny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deny::ForbiddenRole { required, actual } => {
                write!(f, "forbidden role: requires {}, caller is {}", required, actual)
            }
            Deny::StaleCredential => f.write_str("stale credential"),
            Deny::NotResourceOwner { resource } => write!(f, "not owner of {}", resource),
        }
    }
}

impl From<Deny> for ClinicError {
    fn from(deny: Deny) -> Self {
        match deny {
            Deny::ForbiddenRole { required, .. } => {
                ClinicError::Authorization(format!("Operation requires role {}", required))
            }
            Deny::StaleCredential => {
                ClinicError::Authentication("Credential no longer matches an account".into())
            }
            Deny::NotResourceOwner { resource } => not_found(resource),
        }
    }
}

fn not_found(resource: &str) -> ClinicError {
    let mut name = resource.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    ClinicError::NotFound(format!("{} not found", name))
}

/// The resolved, current view of the requester
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: Identity,
    /// Present iff the caller is a Doctor
    pub doctor: Option<DoctorProfile>,
}

impl Caller {
    pub fn id(&self) -> Uuid {
        self.identity.id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    /// Whether the caller is the recorded owner of an appointment
    pub fn owns(&self, appointment: &Appointment) -> bool {
        match self.identity.role {
            Role::Doctor => self
                .doctor
                .as_ref()
                .is_some_and(|d| d.id == appointment.doctor_id),
            Role::Patient => self.identity.id == appointment.patient_id,
            Role::Admin => false,
        }
    }
}

/// An appointment whose ownership check has passed for the caller holding it.
/// Lifecycle transitions only accept this type.
#[derive(Debug, Clone)]
pub struct OwnedAppointment {
    appointment: Appointment,
    owner_role: Role,
}

impl OwnedAppointment {
    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn owner_role(&self) -> Role {
        self.owner_role
    }

    pub fn into_inner(self) -> Appointment {
        self.appointment
    }
}

/// Check the claimed role and re-resolve the caller from the store
pub async fn authorize(store: &dyn ClinicStore, claims: &Claims, required: Role) -> Result<Caller> {
    if claims.role != required {
        warn!(
            "Denied {}: role {} where {} required",
            claims.sub, claims.role, required
        );
        return Err(Deny::ForbiddenRole {
            required,
            actual: claims.role,
        }
        .into());
    }

    let identity = match store.identity_by_id(claims.sub).await? {
        Some(identity) if identity.role == claims.role => identity,
        _ => {
            warn!("Denied {}: identity missing or role changed", claims.sub);
            return Err(Deny::StaleCredential.into());
        }
    };

    let doctor = match identity.role {
        Role::Doctor => match store.doctor_by_identity(identity.id).await? {
            Some(profile) => Some(profile),
            None => {
                warn!("Denied {}: doctor profile missing", claims.sub);
                return Err(Deny::StaleCredential.into());
            }
        },
        Role::Admin | Role::Patient => None,
    };

    Ok(Caller { identity, doctor })
}

/// Ownership check on an already-loaded appointment
pub fn ensure_owner(caller: &Caller, appointment: Appointment) -> Result<OwnedAppointment> {
    if !caller.owns(&appointment) {
        warn!(
            "Denied {}: not owner of appointment {}",
            caller.id(),
            appointment.id
        );
        return Err(Deny::NotResourceOwner {
            resource: "appointment",
        }
        .into());
    }

    Ok(OwnedAppointment {
        appointment,
        owner_role: caller.role(),
    })
}

/// Load an appointment and check ownership. Absent and foreign appointments
/// produce the same error.
pub async fn load_owned_appointment(
    store: &dyn ClinicStore,
    caller: &Caller,
    appointment_id: Uuid,
) -> Result<OwnedAppointment> {
    match store.appointment_by_id(appointment_id).await? {
        Some(appointment) => ensure_owner(caller, appointment),
        None => Err(not_found("appointment")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::store::MemoryStore;

    fn claims_for(identity: &Identity, role: Role) -> Claims {
        Claims {
            sub: identity.id,
            email: identity.email.clone(),
            role,
            iss: "clinic-test".into(),
            iat: 0,
            exp: u64::MAX,
        }
    }

    async fn seeded() -> (MemoryStore, Identity, Identity, DoctorProfile) {
        let store = MemoryStore::new();
        let patient = Identity::new(Role::Patient, "Pat".into(), "p@x.com".into(), "h".into());
        let doctor = Identity::new(Role::Doctor, "Doc".into(), "d@x.com".into(), "h".into());
        let profile = DoctorProfile::new(doctor.id, "GP".into(), "Town".into());
        store.insert_identity(patient.clone()).await.unwrap();
        store
            .insert_doctor(doctor.clone(), profile.clone())
            .await
            .unwrap();
        (store, patient, doctor, profile)
    }

    #[tokio::test]
    async fn test_role_mismatch_is_forbidden() {
        let (store, patient, _, _) = seeded().await;
        let claims = claims_for(&patient, Role::Patient);

        let err = authorize(&store, &claims, Role::Doctor).await.unwrap_err();
        assert!(matches!(err, ClinicError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_resolves_doctor_profile() {
        let (store, _, doctor, profile) = seeded().await;
        let claims = claims_for(&doctor, Role::Doctor);

        let caller = authorize(&store, &claims, Role::Doctor).await.unwrap();
        assert_eq!(caller.id(), doctor.id);
        assert_eq!(caller.doctor.unwrap().id, profile.id);
    }

    #[tokio::test]
    async fn test_deleted_identity_is_stale() {
        let (store, _, doctor, profile) = seeded().await;
        let claims = claims_for(&doctor, Role::Doctor);
        store.delete_doctor(profile.id).await.unwrap();

        let err = authorize(&store, &claims, Role::Doctor).await.unwrap_err();
        assert!(matches!(err, ClinicError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_claimed_role_must_match_stored_role() {
        let (store, patient, _, _) = seeded().await;
        // Token claims Admin for a patient account
        let claims = claims_for(&patient, Role::Admin);

        let err = authorize(&store, &claims, Role::Admin).await.unwrap_err();
        assert!(matches!(err, ClinicError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_doctor_identity_without_profile_is_stale() {
        let store = MemoryStore::new();
        let doctor = Identity::new(Role::Doctor, "Doc".into(), "d@x.com".into(), "h".into());
        store.insert_identity(doctor.clone()).await.unwrap();

        let err = authorize(&store, &claims_for(&doctor, Role::Doctor), Role::Doctor)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_foreign_and_missing_appointments_look_the_same() {
        let (store, patient, doctor, profile) = seeded().await;
        let now = Utc::now();
        let other_patient = Uuid::new_v4();
        let foreign = Appointment::book(other_patient, profile.id, now, now);
        let foreign_id = foreign.id;
        store.insert_appointment(foreign).await.unwrap();

        let caller = authorize(&store, &claims_for(&patient, Role::Patient), Role::Patient)
            .await
            .unwrap();

        let foreign_err = load_owned_appointment(&store, &caller, foreign_id)
            .await
            .unwrap_err();
        let missing_err = load_owned_appointment(&store, &caller, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(foreign_err.to_string(), missing_err.to_string());
        assert!(matches!(foreign_err, ClinicError::NotFound(_)));

        // The doctor on that appointment does own it
        let doctor_caller = authorize(&store, &claims_for(&doctor, Role::Doctor), Role::Doctor)
            .await
            .unwrap();
        let owned = load_owned_appointment(&store, &doctor_caller, foreign_id)
            .await
            .unwrap();
        assert_eq!(owned.owner_role(), Role::Doctor);
    }

    #[test]
    fn test_deny_messages() {
        let deny = Deny::ForbiddenRole {
            required: Role::Admin,
            actual: Role::Patient,
        };
        assert_eq!(
            deny.to_string(),
            "forbidden role: requires Admin, caller is Patient"
        );
        assert_eq!(
            ClinicError::from(Deny::NotResourceOwner {
                resource: "appointment"
            })
            .to_string(),
            "Not found: Appointment not found"
        );
    }
}
