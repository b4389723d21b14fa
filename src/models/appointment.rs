//! Appointments and prescriptions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{now_millis, to_millis};
use crate::types::ClinicError;

/// Appointment status. Pending is initial; Rejected and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Approved => "Approved",
            AppointmentStatus::Rejected => "Rejected",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ClinicError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Pending" => Ok(AppointmentStatus::Pending),
            "Approved" => Ok(AppointmentStatus::Approved),
            "Rejected" => Ok(AppointmentStatus::Rejected),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(ClinicError::Validation(format!(
                "Unknown appointment status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// Identity id of the booking patient
    pub patient_id: Uuid,
    /// Doctor profile id
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// A freshly booked appointment, always Pending. Times are kept at
    /// millisecond precision so they read back unchanged from the store.
    pub fn book(
        patient_id: Uuid,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            scheduled_at: to_millis(scheduled_at),
            status: AppointmentStatus::Pending,
            created_at: to_millis(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Prescription {
    pub fn new(appointment_id: Uuid, notes: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            appointment_id,
            notes,
            created_at: now_millis(),
        }
    }
}

/// Filter for appointment scans; `None` fields match everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

impl AppointmentFilter {
    pub fn for_patient(patient_id: Uuid) -> Self {
        Self {
            patient_id: Some(patient_id),
            doctor_id: None,
        }
    }

    pub fn for_doctor(doctor_id: Uuid) -> Self {
        Self {
            patient_id: None,
            doctor_id: Some(doctor_id),
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "Approved".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Approved
        );
        assert!(matches!(
            "Done".parse::<AppointmentStatus>(),
            Err(ClinicError::Validation(_))
        ));
    }

    #[test]
    fn test_booking_starts_pending() {
        let now = Utc::now();
        let appointment = Appointment::book(Uuid::new_v4(), Uuid::new_v4(), now, now);
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.created_at, to_millis(now));
    }

    #[test]
    fn test_booking_keeps_millisecond_precision() {
        let scheduled = Utc
            .with_ymd_and_hms(2026, 11, 2, 14, 0, 0)
            .unwrap()
            .with_nanosecond(250_999_999)
            .unwrap();
        let appointment = Appointment::book(Uuid::new_v4(), Uuid::new_v4(), scheduled, scheduled);
        assert_eq!(appointment.scheduled_at.nanosecond(), 250_000_000);
        assert_eq!(appointment.created_at, appointment.scheduled_at);

        let prescription = Prescription::new(appointment.id, "Rest".into());
        assert_eq!(prescription.created_at.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_filter() {
        let now = Utc::now();
        let patient = Uuid::new_v4();
        let doctor = Uuid::new_v4();
        let appointment = Appointment::book(patient, doctor, now, now);

        assert!(AppointmentFilter::default().matches(&appointment));
        assert!(AppointmentFilter::for_patient(patient).matches(&appointment));
        assert!(AppointmentFilter::for_doctor(doctor).matches(&appointment));
        assert!(!AppointmentFilter::for_doctor(patient).matches(&appointment));
    }
}
