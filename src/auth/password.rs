//! Password hashing and verification using Argon2
//!
//! New credentials are hashed with argon2id in PHC string format. Credentials
//! imported from the previous system are unsalted `base64(sha256(password))`
//! digests; they still verify, and `needs_rehash` flags them for upgrade.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::types::ClinicError;

const PHC_PREFIX: &str = "$argon2";

/// Argon2id hash with the default parameters that matches no password.
/// Verified on logins for unknown emails so they cost the same as real ones.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$otlkgXXQ8I29k0R9+5b71Q$x2WE5fPGpL6wvN/XkMePDHb8hyUQPl1lHaVxOZJY/b4";

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, ClinicError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ClinicError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// Accepts both Argon2 PHC strings and legacy SHA-256 digests.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ClinicError> {
    if !hash.starts_with(PHC_PREFIX) {
        return verify_legacy(password, hash);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ClinicError::Internal(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Run a full Argon2 verification that always fails
pub fn verify_dummy(password: &str) -> bool {
    verify_password(password, DUMMY_HASH).unwrap_or(false)
}

/// Whether a stored hash should be replaced with a fresh Argon2id hash
pub fn needs_rehash(hash: &str) -> bool {
    !hash.starts_with(PHC_PREFIX)
}

/// Digest in the previous system's format
pub fn legacy_digest(password: &str) -> String {
    STANDARD.encode(Sha256::digest(password.as_bytes()))
}

fn verify_legacy(password: &str, stored: &str) -> Result<bool, ClinicError> {
    let stored = STANDARD
        .decode(stored)
        .map_err(|e| ClinicError::Internal(format!("Invalid password hash format: {e}")))?;
    if stored.len() != 32 {
        return Err(ClinicError::Internal(
            "Invalid password hash format: unexpected digest length".into(),
        ));
    }

    let computed = Sha256::digest(password.as_bytes());
    // Constant-time comparison
    let diff = computed
        .iter()
        .zip(stored.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(diff == 0)
}
