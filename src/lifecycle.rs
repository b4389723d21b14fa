//! Appointment lifecycle
//!
//! ```text
//!              approve (doctor)
//!   Pending ───────────────────▶ Approved
//!     │  │                          │
//!     │  │ reject (doctor)          │ cancel (patient)
//!     │  ▼                          ▼
//!     │ Rejected                Cancelled
//!     │                             ▲
//!     └──────── cancel (patient) ───┘
//! ```
//!
//! Prescriptions attach to an appointment in any status, at most once.
//! Transitions are persisted with a compare-and-set on the prior status.

use tracing::{info, warn};

use crate::auth::OwnedAppointment;
use crate::models::{Appointment, AppointmentStatus, Prescription, Role};
use crate::store::ClinicStore;
use crate::types::{ClinicError, Result};

/// A status-changing trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Approve,
    Reject,
    Cancel,
}

impl StatusAction {
    /// The only role allowed to fire this trigger
    pub fn actor(&self) -> Role {
        match self {
            StatusAction::Approve | StatusAction::Reject => Role::Doctor,
            StatusAction::Cancel => Role::Patient,
        }
    }

    /// Map a doctor's requested status onto a trigger
    pub fn from_doctor_decision(status: &str) -> Result<Self> {
        match status.trim() {
            "Approved" => Ok(StatusAction::Approve),
            "Rejected" => Ok(StatusAction::Reject),
            other => Err(ClinicError::Validation(format!(
                "Invalid status '{}'. Use 'Approved' or 'Rejected'",
                other
            ))),
        }
    }
}

impl AppointmentStatus {
    /// Pure transition table. Anything not listed is a conflict.
    pub fn apply(self, action: StatusAction) -> Result<AppointmentStatus> {
        use crate::models::AppointmentStatus::*;

        match (self, action) {
            (Pending, StatusAction::Approve) => Ok(Approved),
            (Pending, StatusAction::Reject) => Ok(Rejected),
            (Pending | Approved, StatusAction::Cancel) => Ok(Cancelled),
            (Cancelled, StatusAction::Cancel) => Err(ClinicError::Conflict(
                "Appointment is already cancelled".into(),
            )),
            (Rejected, StatusAction::Cancel) => Err(ClinicError::Conflict(
                "Rejected appointments cannot be cancelled".into(),
            )),
            (from, StatusAction::Approve | StatusAction::Reject) => Err(ClinicError::Conflict(
                format!("Appointment is {}; only Pending appointments can be decided", from),
            )),
        }
    }
}

/// Apply a status trigger to an owned appointment and persist it
pub async fn transition(
    store: &dyn ClinicStore,
    owned: OwnedAppointment,
    action: StatusAction,
) -> Result<Appointment> {
    if owned.owner_role() != action.actor() {
        return Err(ClinicError::Authorization(format!(
            "Only the {} on an appointment may {:?} it",
            action.actor(),
            action
        )));
    }

    let mut appointment = owned.into_inner();
    let from = appointment.status;
    let to = from.apply(action)?;

    if !store.update_status_if(appointment.id, from, to).await? {
        warn!(
            "Lost status race on appointment {} ({} -> {})",
            appointment.id, from, to
        );
        return Err(ClinicError::Conflict(
            "Appointment status changed concurrently; reload and retry".into(),
        ));
    }

    info!("Appointment {}: {} -> {}", appointment.id, from, to);
    appointment.status = to;
    Ok(appointment)
}

/// Attach the single prescription an appointment may hold
pub async fn attach_prescription(
    store: &dyn ClinicStore,
    owned: &OwnedAppointment,
    notes: &str,
) -> Result<Prescription> {
    if owned.owner_role() != Role::Doctor {
        return Err(ClinicError::Authorization(
            "Only the appointment's doctor may prescribe".into(),
        ));
    }

    let notes = notes.trim();
    if notes.is_empty() {
        return Err(ClinicError::Validation(
            "Prescription notes are required".into(),
        ));
    }

    let appointment_id = owned.appointment().id;
    if store.prescription_for(appointment_id).await?.is_some() {
        return Err(ClinicError::Conflict(
            "Prescription already exists for this appointment".into(),
        ));
    }

    let prescription = Prescription::new(appointment_id, notes.to_string());
    // The store re-checks uniqueness atomically; a racing insert fails here
    store.insert_prescription(prescription.clone()).await?;

    info!("Prescription {} attached to appointment {}", prescription.id, appointment_id);
    Ok(prescription)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::auth::{authorize, ensure_owner, Claims};
    use crate::models::AppointmentStatus::*;
    use crate::models::{DoctorProfile, Identity};
    use crate::store::MemoryStore;

    const ALL: [AppointmentStatus; 4] = [Pending, Approved, Rejected, Cancelled];
    const ACTIONS: [StatusAction; 3] = [
        StatusAction::Approve,
        StatusAction::Reject,
        StatusAction::Cancel,
    ];

    #[test]
    fn test_only_listed_edges_exist() {
        let allowed = [
            (Pending, StatusAction::Approve, Approved),
            (Pending, StatusAction::Reject, Rejected),
            (Pending, StatusAction::Cancel, Cancelled),
            (Approved, StatusAction::Cancel, Cancelled),
        ];

        for from in ALL {
            for action in ACTIONS {
                let expected = allowed
                    .iter()
                    .find(|(f, a, _)| *f == from && *a == action)
                    .map(|(_, _, to)| *to);
                match (from.apply(action), expected) {
                    (Ok(to), Some(want)) => assert_eq!(to, want),
                    (Err(ClinicError::Conflict(_)), None) => {}
                    (other, want) => panic!("{:?} + {:?}: got {:?}, want {:?}", from, action, other, want),
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Rejected, Cancelled] {
            assert!(from.is_terminal());
            for action in ACTIONS {
                assert!(from.apply(action).is_err());
            }
        }
    }

    #[test]
    fn test_doctor_decision_parsing() {
        assert_eq!(
            StatusAction::from_doctor_decision("Approved").unwrap(),
            StatusAction::Approve
        );
        assert_eq!(
            StatusAction::from_doctor_decision("Rejected").unwrap(),
            StatusAction::Reject
        );
        assert!(matches!(
            StatusAction::from_doctor_decision("Cancelled"),
            Err(ClinicError::Validation(_))
        ));
    }

    struct Fixture {
        store: MemoryStore,
        patient: Identity,
        doctor: Identity,
        appointment: Appointment,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let patient = Identity::new(Role::Patient, "Pat".into(), "p@x.com".into(), "h".into());
        let doctor = Identity::new(Role::Doctor, "Doc".into(), "d@x.com".into(), "h".into());
        let profile = DoctorProfile::new(doctor.id, "GP".into(), "Town".into());
        let now = Utc::now();
        let appointment = Appointment::book(patient.id, profile.id, now, now);

        store.insert_identity(patient.clone()).await.unwrap();
        store.insert_doctor(doctor.clone(), profile).await.unwrap();
        store.insert_appointment(appointment.clone()).await.unwrap();

        Fixture {
            store,
            patient,
            doctor,
            appointment,
        }
    }

    async fn owned_by(f: &Fixture, identity: &Identity) -> OwnedAppointment {
        let claims = Claims {
            sub: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            iss: "t".into(),
            iat: 0,
            exp: u64::MAX,
        };
        let caller = authorize(&f.store, &claims, identity.role).await.unwrap();
        let current = f
            .store
            .appointment_by_id(f.appointment.id)
            .await
            .unwrap()
            .unwrap();
        ensure_owner(&caller, current).unwrap()
    }

    #[tokio::test]
    async fn test_transition_persists() {
        let f = fixture().await;

        let owned = owned_by(&f, &f.doctor).await;
        let updated = transition(&f.store, owned, StatusAction::Approve)
            .await
            .unwrap();
        assert_eq!(updated.status, Approved);

        let stored = f.store.appointment_by_id(f.appointment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Approved);
    }

    #[tokio::test]
    async fn test_stale_snapshot_loses_race() {
        let f = fixture().await;

        // Two doctor requests read the appointment while it is Pending
        let first = owned_by(&f, &f.doctor).await;
        let second = owned_by(&f, &f.doctor).await;

        transition(&f.store, first, StatusAction::Approve)
            .await
            .unwrap();
        let err = transition(&f.store, second, StatusAction::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        let stored = f.store.appointment_by_id(f.appointment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Approved);
    }

    #[tokio::test]
    async fn test_actor_must_match_trigger() {
        let f = fixture().await;

        let as_patient = owned_by(&f, &f.patient).await;
        let err = transition(&f.store, as_patient, StatusAction::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Authorization(_)));

        let as_doctor = owned_by(&f, &f.doctor).await;
        let err = transition(&f.store, as_doctor, StatusAction::Cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_prescription_once() {
        let f = fixture().await;
        let owned = owned_by(&f, &f.doctor).await;

        assert!(matches!(
            attach_prescription(&f.store, &owned, "   ").await,
            Err(ClinicError::Validation(_))
        ));

        let first = attach_prescription(&f.store, &owned, "Ibuprofen 200mg")
            .await
            .unwrap();
        assert_eq!(first.notes, "Ibuprofen 200mg");

        let err = attach_prescription(&f.store, &owned, "Something else")
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        let stored = f
            .store
            .prescription_for(f.appointment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.notes, "Ibuprofen 200mg");
    }
}
