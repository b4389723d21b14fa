//! Authentication and authorization for the clinic
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2 (legacy SHA-256 digests still verify)
//! - The authorization guard: role checks, caller re-resolution, ownership

pub mod guard;
pub mod jwt;
pub mod password;

pub use guard::{authorize, ensure_owner, load_owned_appointment, Caller, Deny, OwnedAppointment};
pub use jwt::{extract_token_from_header, Claims, IssuedToken, JwtValidator, TokenInput};
pub use password::{hash_password, needs_rehash, verify_dummy, verify_password};
