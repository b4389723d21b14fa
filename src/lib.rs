//! Clinic - role-gated appointment booking backend
//!
//! Admins manage doctors and read reports, patients discover doctors and book
//! appointments, doctors decide on and prescribe for their own appointments.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (routes) -> Clinic (services) -> guard + lifecycle -> ClinicStore
//!                                                           |-- MongoStore
//!                                                           '-- MemoryStore
//! ```
//!
//! Every protected request carries a bearer token. The token is verified,
//! the caller is re-read from the store, and ownership-scoped operations
//! only proceed with an [`auth::OwnedAppointment`].

pub mod auth;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use services::Clinic;
pub use types::{ClinicError, Result};
