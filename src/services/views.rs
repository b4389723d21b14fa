//! Response shapes and the joins that build them

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, DoctorProfile, Identity, Prescription, Role};
use crate::store::ClinicStore;
use crate::types::Result;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: u64,
    pub identity_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Identity> for RegisteredIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorView {
    /// Doctor profile id
    pub id: Uuid,
    pub identity_id: Uuid,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub location: String,
}

/// One side of an appointment. For doctors `id` is the profile id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionView {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
}

impl PrescriptionView {
    fn bare(prescription: &Prescription) -> Self {
        Self {
            id: prescription.id,
            appointment_id: prescription.appointment_id,
            notes: prescription.notes.clone(),
            created_at: prescription.created_at,
            scheduled_at: None,
            doctor_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    /// Absent when the patient record no longer resolves
    pub patient: Option<PartyView>,
    /// Absent when the doctor has been deleted
    pub doctor: Option<PartyView>,
    pub prescription: Option<PrescriptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointmentCount {
    pub doctor_id: Uuid,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
    pub appointment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointmentCount {
    pub patient_id: Uuid,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub appointment_count: usize,
}

fn unique(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Join doctor profiles with their identities, sorted by name
pub(crate) async fn doctor_views(
    store: &dyn ClinicStore,
    profiles: Vec<DoctorProfile>,
) -> Result<Vec<DoctorView>> {
    let identity_ids = unique(profiles.iter().map(|p| p.identity_id));
    let identities: HashMap<Uuid, Identity> = store
        .identities_by_ids(&identity_ids)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let mut views: Vec<DoctorView> = profiles
        .into_iter()
        .filter_map(|profile| match identities.get(&profile.identity_id) {
            Some(identity) => Some(DoctorView {
                id: profile.id,
                identity_id: identity.id,
                name: identity.name.clone(),
                email: identity.email.clone(),
                specialty: profile.specialty,
                location: profile.location,
            }),
            None => {
                warn!("Doctor profile {} has no backing identity", profile.id);
                None
            }
        })
        .collect();

    views.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(views)
}

/// Resolved parties for a batch of appointments
pub(crate) struct Parties {
    identities: HashMap<Uuid, Identity>,
    doctors: HashMap<Uuid, DoctorProfile>,
}

impl Parties {
    pub(crate) async fn load(store: &dyn ClinicStore, appointments: &[Appointment]) -> Result<Self> {
        let doctor_ids = unique(appointments.iter().map(|a| a.doctor_id));
        let doctors: HashMap<Uuid, DoctorProfile> = store
            .doctors_by_ids(&doctor_ids)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let identity_ids = unique(
            appointments
                .iter()
                .map(|a| a.patient_id)
                .chain(doctors.values().map(|d| d.identity_id)),
        );
        let identities = store
            .identities_by_ids(&identity_ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        Ok(Self {
            identities,
            doctors,
        })
    }

    pub(crate) fn patient(&self, patient_id: Uuid) -> Option<PartyView> {
        self.identities.get(&patient_id).map(|i| PartyView {
            id: i.id,
            name: i.name.clone(),
            email: i.email.clone(),
        })
    }

    pub(crate) fn doctor(&self, doctor_id: Uuid) -> Option<PartyView> {
        let profile = self.doctors.get(&doctor_id)?;
        self.identities.get(&profile.identity_id).map(|i| PartyView {
            id: profile.id,
            name: i.name.clone(),
            email: i.email.clone(),
        })
    }
}

/// Join appointments with both parties and any prescription
pub(crate) async fn appointment_views(
    store: &dyn ClinicStore,
    appointments: Vec<Appointment>,
) -> Result<Vec<AppointmentView>> {
    let parties = Parties::load(store, &appointments).await?;

    let ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();
    let prescriptions: HashMap<Uuid, Prescription> = store
        .prescriptions_for(&ids)
        .await?
        .into_iter()
        .map(|p| (p.appointment_id, p))
        .collect();

    let mut views: Vec<AppointmentView> = appointments
        .into_iter()
        .map(|a| AppointmentView {
            patient: parties.patient(a.patient_id),
            doctor: parties.doctor(a.doctor_id),
            prescription: prescriptions.get(&a.id).map(PrescriptionView::bare),
            id: a.id,
            patient_id: a.patient_id,
            doctor_id: a.doctor_id,
            scheduled_at: a.scheduled_at,
            status: a.status,
            created_at: a.created_at,
        })
        .collect();

    views.sort_by(|a, b| {
        a.scheduled_at
            .cmp(&b.scheduled_at)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    Ok(views)
}

pub(crate) async fn appointment_view(
    store: &dyn ClinicStore,
    appointment: Appointment,
) -> Result<AppointmentView> {
    let mut views = appointment_views(store, vec![appointment]).await?;
    Ok(views.remove(0))
}

/// Prescriptions with the appointment time and prescribing doctor's name
pub(crate) async fn prescription_views(
    store: &dyn ClinicStore,
    appointments: &[Appointment],
    prescriptions: Vec<Prescription>,
) -> Result<Vec<PrescriptionView>> {
    let parties = Parties::load(store, appointments).await?;
    let by_id: HashMap<Uuid, &Appointment> = appointments.iter().map(|a| (a.id, a)).collect();

    let mut views: Vec<PrescriptionView> = prescriptions
        .iter()
        .map(|p| {
            let appointment = by_id.get(&p.appointment_id);
            PrescriptionView {
                scheduled_at: appointment.map(|a| a.scheduled_at),
                doctor_name: appointment
                    .and_then(|a| parties.doctor(a.doctor_id))
                    .map(|d| d.name),
                ..PrescriptionView::bare(p)
            }
        })
        .collect();

    views.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(views)
}

/// Appointment counts grouped by doctor, busiest first
pub(crate) fn count_by_doctor(
    appointments: &[Appointment],
    parties: &Parties,
) -> Vec<DoctorAppointmentCount> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for a in appointments {
        *counts.entry(a.doctor_id).or_default() += 1;
    }

    let mut rows: Vec<DoctorAppointmentCount> = counts
        .into_iter()
        .map(|(doctor_id, appointment_count)| {
            let party = parties.doctor(doctor_id);
            DoctorAppointmentCount {
                doctor_id,
                doctor_name: party.as_ref().map(|p| p.name.clone()),
                doctor_email: party.map(|p| p.email),
                appointment_count,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.appointment_count
            .cmp(&a.appointment_count)
            .then(a.doctor_id.cmp(&b.doctor_id))
    });
    rows
}

/// Appointment counts grouped by patient, busiest first
pub(crate) fn count_by_patient(
    appointments: &[Appointment],
    parties: &Parties,
) -> Vec<PatientAppointmentCount> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for a in appointments {
        *counts.entry(a.patient_id).or_default() += 1;
    }

    let mut rows: Vec<PatientAppointmentCount> = counts
        .into_iter()
        .map(|(patient_id, appointment_count)| {
            let party = parties.patient(patient_id);
            PatientAppointmentCount {
                patient_id,
                patient_name: party.as_ref().map(|p| p.name.clone()),
                patient_email: party.map(|p| p.email),
                appointment_count,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.appointment_count
            .cmp(&a.appointment_count)
            .then(a.patient_id.cmp(&b.patient_id))
    });
    rows
}
