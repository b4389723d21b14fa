//! Domain records shared by the store, the lifecycle engine and the service

mod appointment;
mod identity;

use chrono::{DateTime, Duration, DurationRound, Utc};

pub use appointment::{Appointment, AppointmentFilter, AppointmentStatus, Prescription};
pub use identity::{normalize_email, DoctorEdit, DoctorFilter, DoctorProfile, Identity, Role};

/// Truncate a timestamp to whole milliseconds, the precision BSON dates keep
pub fn to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::milliseconds(1)).unwrap_or(at)
}

/// Current time at stored precision
pub fn now_millis() -> DateTime<Utc> {
    to_millis(Utc::now())
}
