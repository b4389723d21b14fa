//! MongoDB-backed [`ClinicStore`]
//!
//! - Identity and doctor profile share one document, so doctor creation and
//!   removal are single-document writes.
//! - Email uniqueness is a partial unique index over live identities.
//! - Status changes are conditional updates on `{_id, status}`.
//! - The unique `appointment_id` index on prescriptions rejects a second
//!   prescription even under concurrent requests.

use async_trait::async_trait;
use bson::{doc, Document};
use tracing::{debug, info};
use uuid::Uuid;

use super::mongo::{MongoClient, MongoCollection, WriteOutcome};
use super::schemas::{
    AppointmentDoc, IdentityDoc, PrescriptionDoc, APPOINTMENT_COLLECTION, IDENTITY_COLLECTION,
    PRESCRIPTION_COLLECTION,
};
use crate::models::{
    normalize_email, Appointment, AppointmentFilter, AppointmentStatus, DoctorEdit, DoctorFilter,
    DoctorProfile, Identity, Prescription,
};
use crate::store::ClinicStore;
use crate::types::{ClinicError, Result};

fn duplicate_email() -> ClinicError {
    ClinicError::Validation("Email already exists".into())
}

fn id_list(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// Escape a user-supplied term for use inside a `$regex`
fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn doctor_query(filter: &DoctorFilter) -> Document {
    let mut query = doc! { "doctor": { "$exists": true } };
    if let Some(specialty) = &filter.specialty {
        query.insert(
            "doctor.specialty",
            doc! { "$regex": regex_escape(specialty), "$options": "i" },
        );
    }
    if let Some(location) = &filter.location {
        query.insert(
            "doctor.location",
            doc! { "$regex": regex_escape(location), "$options": "i" },
        );
    }
    query
}

fn appointment_query(filter: &AppointmentFilter) -> Document {
    let mut query = Document::new();
    if let Some(patient_id) = filter.patient_id {
        query.insert("patient_id", patient_id.to_string());
    }
    if let Some(doctor_id) = filter.doctor_id {
        query.insert("doctor_id", doctor_id.to_string());
    }
    query
}

fn edit_set(edit: &DoctorEdit) -> Document {
    let mut set = Document::new();
    if let Some(name) = &edit.name {
        set.insert("name", name.as_str());
    }
    if let Some(email) = &edit.email {
        set.insert("email", normalize_email(email));
    }
    if let Some(specialty) = &edit.specialty {
        set.insert("doctor.specialty", specialty.as_str());
    }
    if let Some(location) = &edit.location {
        set.insert("doctor.location", location.as_str());
    }
    set
}

fn profiles(docs: Vec<IdentityDoc>) -> Result<Vec<DoctorProfile>> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        if let Some(profile) = doc.to_profile()? {
            out.push(profile);
        }
    }
    Ok(out)
}

pub struct MongoStore {
    identities: MongoCollection<IdentityDoc>,
    appointments: MongoCollection<AppointmentDoc>,
    prescriptions: MongoCollection<PrescriptionDoc>,
}

impl MongoStore {
    /// Open the clinic collections, creating indexes as needed
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let store = Self {
            identities: client.collection(IDENTITY_COLLECTION).await?,
            appointments: client.collection(APPOINTMENT_COLLECTION).await?,
            prescriptions: client.collection(PRESCRIPTION_COLLECTION).await?,
        };
        info!("MongoDB store ready on database '{}'", client.db_name());
        Ok(store)
    }
}

#[async_trait]
impl ClinicStore for MongoStore {
    async fn insert_identity(&self, identity: Identity) -> Result<()> {
        match self
            .identities
            .insert_one(IdentityDoc::new(identity, None))
            .await?
        {
            WriteOutcome::Done(()) => Ok(()),
            WriteOutcome::DuplicateKey => Err(duplicate_email()),
        }
    }

    async fn identity_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        self.identities
            .find_one(doc! { "_id": id.to_string() })
            .await?
            .map(|doc| doc.to_identity())
            .transpose()
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        self.identities
            .find_one(doc! { "email": normalize_email(email) })
            .await?
            .map(|doc| doc.to_identity())
            .transpose()
    }

    async fn identities_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Identity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.identities
            .find_many(doc! { "_id": { "$in": id_list(ids) } })
            .await?
            .iter()
            .map(IdentityDoc::to_identity)
            .collect()
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: String) -> Result<()> {
        let result = match self
            .identities
            .update_one(
                doc! { "_id": id.to_string() },
                doc! { "password_hash": password_hash },
            )
            .await?
        {
            WriteOutcome::Done(result) => result,
            WriteOutcome::DuplicateKey => {
                return Err(ClinicError::Database("Unexpected duplicate key".into()))
            }
        };

        if result.matched_count == 0 {
            return Err(ClinicError::NotFound("Identity not found".into()));
        }
        Ok(())
    }

    async fn insert_doctor(&self, identity: Identity, profile: DoctorProfile) -> Result<()> {
        if profile.identity_id != identity.id {
            return Err(ClinicError::Internal(
                "Doctor profile does not reference its identity".into(),
            ));
        }

        match self
            .identities
            .insert_one(IdentityDoc::new(identity, Some(profile)))
            .await?
        {
            WriteOutcome::Done(()) => Ok(()),
            WriteOutcome::DuplicateKey => Err(duplicate_email()),
        }
    }

    async fn doctor_by_id(&self, id: Uuid) -> Result<Option<DoctorProfile>> {
        match self
            .identities
            .find_one(doc! { "doctor.id": id.to_string() })
            .await?
        {
            Some(doc) => doc.to_profile(),
            None => Ok(None),
        }
    }

    async fn doctor_by_identity(&self, identity_id: Uuid) -> Result<Option<DoctorProfile>> {
        match self
            .identities
            .find_one(doc! { "_id": identity_id.to_string() })
            .await?
        {
            Some(doc) => doc.to_profile(),
            None => Ok(None),
        }
    }

    async fn doctors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<DoctorProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .identities
            .find_many(doc! { "doctor.id": { "$in": id_list(ids) } })
            .await?;
        profiles(docs)
    }

    async fn list_doctors(&self, filter: &DoctorFilter) -> Result<Vec<DoctorProfile>> {
        let docs = self.identities.find_many(doctor_query(filter)).await?;
        profiles(docs)
    }

    async fn update_doctor(&self, id: Uuid, edit: &DoctorEdit) -> Result<bool> {
        let filter = doc! { "doctor.id": id.to_string() };

        if edit.is_empty() {
            return Ok(self.identities.find_one(filter).await?.is_some());
        }

        match self.identities.update_one(filter, edit_set(edit)).await? {
            WriteOutcome::Done(result) => Ok(result.matched_count > 0),
            WriteOutcome::DuplicateKey => Err(duplicate_email()),
        }
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<bool> {
        let result = self
            .identities
            .soft_delete(doc! { "doctor.id": id.to_string() })
            .await?;

        if result.matched_count > 0 {
            debug!("Soft-deleted doctor {}", id);
        }
        Ok(result.matched_count > 0)
    }

    async fn insert_appointment(&self, appointment: Appointment) -> Result<()> {
        match self
            .appointments
            .insert_one(AppointmentDoc::from(appointment))
            .await?
        {
            WriteOutcome::Done(()) => Ok(()),
            WriteOutcome::DuplicateKey => {
                Err(ClinicError::Conflict("Appointment already exists".into()))
            }
        }
    }

    async fn appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        self.appointments
            .find_one(doc! { "_id": id.to_string() })
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut appointments = self
            .appointments
            .find_many(appointment_query(filter))
            .await?
            .into_iter()
            .map(Appointment::try_from)
            .collect::<Result<Vec<_>>>()?;
        appointments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(appointments)
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<bool> {
        let filter = doc! { "_id": id.to_string(), "status": expected.as_str() };
        match self
            .appointments
            .update_one(filter, doc! { "status": next.as_str() })
            .await?
        {
            WriteOutcome::Done(result) => Ok(result.matched_count == 1),
            WriteOutcome::DuplicateKey => {
                Err(ClinicError::Database("Unexpected duplicate key".into()))
            }
        }
    }

    async fn insert_prescription(&self, prescription: Prescription) -> Result<()> {
        let appointment = self
            .appointments
            .find_one(doc! { "_id": prescription.appointment_id.to_string() })
            .await?;
        if appointment.is_none() {
            return Err(ClinicError::NotFound("Appointment not found".into()));
        }

        match self
            .prescriptions
            .insert_one(PrescriptionDoc::from(prescription))
            .await?
        {
            WriteOutcome::Done(()) => Ok(()),
            WriteOutcome::DuplicateKey => Err(ClinicError::Conflict(
                "Prescription already exists for this appointment".into(),
            )),
        }
    }

    async fn prescription_for(&self, appointment_id: Uuid) -> Result<Option<Prescription>> {
        self.prescriptions
            .find_one(doc! { "appointment_id": appointment_id.to_string() })
            .await?
            .map(Prescription::try_from)
            .transpose()
    }

    async fn prescriptions_for(&self, appointment_ids: &[Uuid]) -> Result<Vec<Prescription>> {
        if appointment_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.prescriptions
            .find_many(doc! { "appointment_id": { "$in": id_list(appointment_ids) } })
            .await?
            .into_iter()
            .map(Prescription::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_escape() {
        assert_eq!(regex_escape("cardio"), "cardio");
        assert_eq!(regex_escape("a.b*(c)"), "a\\.b\\*\\(c\\)");
    }

    #[test]
    fn test_doctor_query() {
        let query = doctor_query(&DoctorFilter {
            specialty: Some("derm".into()),
            location: None,
        });
        assert!(query.contains_key("doctor"));
        assert_eq!(
            query.get_document("doctor.specialty").unwrap(),
            &doc! { "$regex": "derm", "$options": "i" }
        );
        assert!(!query.contains_key("doctor.location"));
    }

    #[test]
    fn test_edit_set_only_touches_given_fields() {
        let set = edit_set(&DoctorEdit {
            email: Some(" New@X.com ".into()),
            location: Some("Bergen".into()),
            ..Default::default()
        });
        assert_eq!(set.get_str("email").unwrap(), "new@x.com");
        assert_eq!(set.get_str("doctor.location").unwrap(), "Bergen");
        assert!(!set.contains_key("name"));
        assert!(!set.contains_key("doctor.specialty"));
    }
}
