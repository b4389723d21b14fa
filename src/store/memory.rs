//! In-memory record store
//!
//! All tables live behind a single `RwLock`, so every multi-record mutation
//! (identity + profile insert, cascade delete, status compare-and-set,
//! unique prescription insert) happens under one write guard.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::ClinicStore;
use crate::models::{
    normalize_email, Appointment, AppointmentFilter, AppointmentStatus, DoctorEdit, DoctorFilter,
    DoctorProfile, Identity, Prescription,
};
use crate::types::{ClinicError, Result};

#[derive(Default)]
struct Tables {
    identities: HashMap<Uuid, Identity>,
    /// normalized email -> identity id
    emails: HashMap<String, Uuid>,
    doctors: HashMap<Uuid, DoctorProfile>,
    /// identity id -> doctor profile id
    doctor_identities: HashMap<Uuid, Uuid>,
    appointments: HashMap<Uuid, Appointment>,
    /// appointment id -> prescription
    prescriptions: HashMap<Uuid, Prescription>,
}

impl Tables {
    fn ensure_email_free(&self, email: &str, owner: Option<Uuid>) -> Result<()> {
        match self.emails.get(email) {
            Some(existing) if Some(*existing) != owner => Err(duplicate_email()),
            _ => Ok(()),
        }
    }

    fn put_identity(&mut self, identity: Identity) {
        self.emails.insert(identity.email.clone(), identity.id);
        self.identities.insert(identity.id, identity);
    }
}

fn duplicate_email() -> ClinicError {
    ClinicError::Validation("Email already exists".into())
}

/// Store used by tests and by dev mode when MongoDB is unreachable
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn insert_identity(&self, identity: Identity) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_email_free(&identity.email, None)?;
        tables.put_identity(identity);
        Ok(())
    }

    async fn identity_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        Ok(self.tables.read().await.identities.get(&id).cloned())
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(&normalize_email(email))
            .and_then(|id| tables.identities.get(id))
            .cloned())
    }

    async fn identities_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Identity>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.identities.get(id))
            .cloned()
            .collect())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: String) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.identities.get_mut(&id) {
            Some(identity) => {
                identity.password_hash = password_hash;
                Ok(())
            }
            None => Err(ClinicError::NotFound("Identity not found".into())),
        }
    }

    async fn insert_doctor(&self, identity: Identity, profile: DoctorProfile) -> Result<()> {
        if profile.identity_id != identity.id {
            return Err(ClinicError::Internal(
                "Doctor profile does not reference its identity".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        tables.ensure_email_free(&identity.email, None)?;
        tables.doctor_identities.insert(identity.id, profile.id);
        tables.doctors.insert(profile.id, profile);
        tables.put_identity(identity);
        Ok(())
    }

    async fn doctor_by_id(&self, id: Uuid) -> Result<Option<DoctorProfile>> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn doctor_by_identity(&self, identity_id: Uuid) -> Result<Option<DoctorProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .doctor_identities
            .get(&identity_id)
            .and_then(|id| tables.doctors.get(id))
            .cloned())
    }

    async fn doctors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<DoctorProfile>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.doctors.get(id))
            .cloned()
            .collect())
    }

    async fn list_doctors(&self, filter: &DoctorFilter) -> Result<Vec<DoctorProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .doctors
            .values()
            .filter(|profile| filter.matches(profile))
            .cloned()
            .collect())
    }

    async fn update_doctor(&self, id: Uuid, edit: &DoctorEdit) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let identity_id = match tables.doctors.get(&id) {
            Some(profile) => profile.identity_id,
            None => return Ok(false),
        };

        let new_email = edit.email.as_deref().map(normalize_email);
        if let Some(email) = &new_email {
            tables.ensure_email_free(email, Some(identity_id))?;
        }

        if let Some(profile) = tables.doctors.get_mut(&id) {
            if let Some(specialty) = &edit.specialty {
                profile.specialty = specialty.clone();
            }
            if let Some(location) = &edit.location {
                profile.location = location.clone();
            }
        }

        let old_email = match tables.identities.get_mut(&identity_id) {
            Some(identity) => {
                if let Some(name) = &edit.name {
                    identity.name = name.clone();
                }
                match &new_email {
                    Some(email) => Some(std::mem::replace(&mut identity.email, email.clone())),
                    None => None,
                }
            }
            None => None,
        };

        if let (Some(old), Some(new)) = (old_email, new_email) {
            tables.emails.remove(&old);
            tables.emails.insert(new, identity_id);
        }

        Ok(true)
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let profile = match tables.doctors.remove(&id) {
            Some(p) => p,
            None => return Ok(false),
        };
        tables.doctor_identities.remove(&profile.identity_id);
        if let Some(identity) = tables.identities.remove(&profile.identity_id) {
            tables.emails.remove(&identity.email);
        }

        debug!("Removed doctor {} and identity {}", id, profile.identity_id);
        Ok(true)
    }

    async fn insert_appointment(&self, appointment: Appointment) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.appointments.insert(appointment.id, appointment);
        Ok(())
    }

    async fn appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(appointments)
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.appointments.get_mut(&id) {
            Some(appointment) if appointment.status == expected => {
                appointment.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_prescription(&self, prescription: Prescription) -> Result<()> {
        let mut tables = self.tables.write().await;

        if !tables.appointments.contains_key(&prescription.appointment_id) {
            return Err(ClinicError::NotFound("Appointment not found".into()));
        }
        if tables.prescriptions.contains_key(&prescription.appointment_id) {
            return Err(ClinicError::Conflict(
                "Prescription already exists for this appointment".into(),
            ));
        }

        tables
            .prescriptions
            .insert(prescription.appointment_id, prescription);
        Ok(())
    }

    async fn prescription_for(&self, appointment_id: Uuid) -> Result<Option<Prescription>> {
        Ok(self
            .tables
            .read()
            .await
            .prescriptions
            .get(&appointment_id)
            .cloned())
    }

    async fn prescriptions_for(&self, appointment_ids: &[Uuid]) -> Result<Vec<Prescription>> {
        let tables = self.tables.read().await;
        Ok(appointment_ids
            .iter()
            .filter_map(|id| tables.prescriptions.get(id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use std::sync::Arc;

    use crate::models::Role;

    fn patient(email: &str) -> Identity {
        Identity::new(Role::Patient, "Pat".into(), email.into(), "hash".into())
    }

    fn doctor(email: &str) -> (Identity, DoctorProfile) {
        let identity = Identity::new(Role::Doctor, "Doc".into(), email.into(), "hash".into());
        let profile = DoctorProfile::new(identity.id, "Cardiology".into(), "Lagos".into());
        (identity, profile)
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_case_insensitive() {
        let store = MemoryStore::new();
        store.insert_identity(patient("a@x.com")).await.unwrap();

        let result = store.insert_identity(patient("A@X.com")).await;
        assert!(matches!(result, Err(ClinicError::Validation(_))));

        let found = store.identity_by_email(" A@x.COM").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_doctor_insert_and_cascade_delete() {
        let store = MemoryStore::new();
        let (identity, profile) = doctor("doc@x.com");
        let (identity_id, profile_id) = (identity.id, profile.id);
        store.insert_doctor(identity, profile).await.unwrap();

        assert_eq!(
            store.doctor_by_identity(identity_id).await.unwrap().unwrap().id,
            profile_id
        );

        assert!(store.delete_doctor(profile_id).await.unwrap());
        assert!(store.doctor_by_id(profile_id).await.unwrap().is_none());
        assert!(store.identity_by_id(identity_id).await.unwrap().is_none());
        assert!(store.identity_by_email("doc@x.com").await.unwrap().is_none());

        // Email is free again
        store.insert_identity(patient("doc@x.com")).await.unwrap();

        assert!(!store.delete_doctor(profile_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_doctor_insert_rejects_taken_email_atomically() {
        let store = MemoryStore::new();
        store.insert_identity(patient("doc@x.com")).await.unwrap();

        let (identity, profile) = doctor("doc@x.com");
        let profile_id = profile.id;
        assert!(store.insert_doctor(identity, profile).await.is_err());
        assert!(store.doctor_by_id(profile_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_doctor_email_collision() {
        let store = MemoryStore::new();
        store.insert_identity(patient("taken@x.com")).await.unwrap();
        let (identity, profile) = doctor("doc@x.com");
        let (identity_id, profile_id) = (identity.id, profile.id);
        store.insert_doctor(identity, profile).await.unwrap();

        let clash = DoctorEdit {
            email: Some("taken@x.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_doctor(profile_id, &clash).await,
            Err(ClinicError::Validation(_))
        ));

        let edit = DoctorEdit {
            email: Some("New@x.com".into()),
            location: Some("Abuja".into()),
            ..Default::default()
        };
        assert!(store.update_doctor(profile_id, &edit).await.unwrap());

        let identity = store.identity_by_id(identity_id).await.unwrap().unwrap();
        assert_eq!(identity.email, "new@x.com");
        assert_eq!(identity.name, "Doc");
        assert!(store.identity_by_email("doc@x.com").await.unwrap().is_none());
        let profile = store.doctor_by_id(profile_id).await.unwrap().unwrap();
        assert_eq!(profile.location, "Abuja");
        assert_eq!(profile.specialty, "Cardiology");

        assert!(!store.update_doctor(Uuid::new_v4(), &edit).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_compare_and_set() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let appointment = Appointment::book(Uuid::new_v4(), Uuid::new_v4(), now, now);
        let id = appointment.id;
        store.insert_appointment(appointment).await.unwrap();

        assert!(store
            .update_status_if(id, AppointmentStatus::Pending, AppointmentStatus::Approved)
            .await
            .unwrap());
        assert!(!store
            .update_status_if(id, AppointmentStatus::Pending, AppointmentStatus::Rejected)
            .await
            .unwrap());
        assert_eq!(
            store.appointment_by_id(id).await.unwrap().unwrap().status,
            AppointmentStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_concurrent_compare_and_set_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let appointment = Appointment::book(Uuid::new_v4(), Uuid::new_v4(), now, now);
        let id = appointment.id;
        store.insert_appointment(appointment).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let next = if i % 2 == 0 {
                AppointmentStatus::Approved
            } else {
                AppointmentStatus::Rejected
            };
            handles.push(tokio::spawn(async move {
                store
                    .update_status_if(id, AppointmentStatus::Pending, next)
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_second_prescription_conflicts() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let appointment = Appointment::book(Uuid::new_v4(), Uuid::new_v4(), now, now);
        let id = appointment.id;
        store.insert_appointment(appointment).await.unwrap();

        store
            .insert_prescription(Prescription::new(id, "Rest".into()))
            .await
            .unwrap();
        let second = store
            .insert_prescription(Prescription::new(id, "Other".into()))
            .await;
        assert!(matches!(second, Err(ClinicError::Conflict(_))));
        assert_eq!(
            store.prescription_for(id).await.unwrap().unwrap().notes,
            "Rest"
        );

        let orphan = store
            .insert_prescription(Prescription::new(Uuid::new_v4(), "x".into()))
            .await;
        assert!(matches!(orphan, Err(ClinicError::NotFound(_))));
    }
}
