//! Shared types

mod error;

pub use error::{ClinicError, Result};
