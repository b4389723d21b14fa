//! Public account operations: register and login
//!
//! Registration flow:
//! 1. Validate name, email, password and role
//! 2. Reject Doctor (added by admins) and Admin (unless enabled)
//! 3. Hash password with argon2
//! 4. Insert identity; the store enforces email uniqueness
//!
//! Login flow:
//! 1. Look up identity by email
//! 2. Verify password; upgrade legacy digests in place
//! 3. Issue a signed token

use serde::Deserialize;
use tracing::{info, warn};

use super::views::{AuthResponse, RegisteredIdentity};
use super::{required, validate_email, Clinic};
use crate::auth::{hash_password, needs_rehash, verify_dummy, verify_password, TokenInput};
use crate::models::{Identity, Role};
use crate::types::{ClinicError, Result};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn invalid_credentials() -> ClinicError {
    // Same message for unknown email and wrong password
    ClinicError::Authentication("Invalid credentials".into())
}

pub(crate) fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClinicError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

impl Clinic {
    /// Create a new identity
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisteredIdentity> {
        let name = required("Name", &request.name)?;
        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;
        let role: Role = request.role.parse()?;

        match role {
            Role::Patient => {}
            Role::Admin if self.config.allow_admin_registration => {}
            Role::Admin => {
                return Err(ClinicError::Validation(
                    "Admin registration is disabled".into(),
                ))
            }
            Role::Doctor => {
                return Err(ClinicError::Validation(
                    "Doctors are added by an administrator".into(),
                ))
            }
        }

        if self.store.identity_by_email(&email).await?.is_some() {
            return Err(ClinicError::Validation("Email already registered".into()));
        }

        let password_hash = hash_password(&request.password)?;
        let identity = Identity::new(role, name, email, password_hash);
        let registered = RegisteredIdentity::from(&identity);

        self.store.insert_identity(identity).await?;

        info!("Registered {} {}", registered.role, registered.email);
        Ok(registered)
    }

    /// Authenticate with email and password and issue a session token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ClinicError::Validation(
                "Missing required fields: email, password".into(),
            ));
        }

        let identity = match self.store.identity_by_email(&request.email).await? {
            Some(identity) => identity,
            None => {
                verify_dummy(&request.password);
                warn!("Login failed - unknown email: {}", request.email.trim());
                return Err(invalid_credentials());
            }
        };

        if !verify_password(&request.password, &identity.password_hash)? {
            warn!("Login failed - invalid password: {}", identity.email);
            return Err(invalid_credentials());
        }

        if needs_rehash(&identity.password_hash) {
            match hash_password(&request.password) {
                Ok(upgraded) => {
                    if let Err(e) = self.store.update_password_hash(identity.id, upgraded).await {
                        warn!("Could not upgrade password hash for {}: {}", identity.email, e);
                    } else {
                        info!("Upgraded legacy password hash for {}", identity.email);
                    }
                }
                Err(e) => warn!("Could not rehash password for {}: {}", identity.email, e),
            }
        }

        let issued = self.jwt.generate_token(TokenInput {
            identity_id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
        })?;

        info!("Login successful: {} ({})", identity.email, identity.role);

        Ok(AuthResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            identity_id: identity.id,
            name: identity.name,
            email: identity.email,
            role: identity.role,
        })
    }

    /// Ensure a configured bootstrap admin exists. An existing admin with the
    /// same email is left untouched.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<()> {
        let name = required("Admin name", name)?;
        let email = validate_email(email)?;
        validate_password(password)?;

        match self.store.identity_by_email(&email).await? {
            Some(existing) if existing.role == Role::Admin => {
                info!("Bootstrap admin {} already present", existing.email);
                Ok(())
            }
            Some(existing) => Err(ClinicError::Config(format!(
                "Bootstrap admin email {} belongs to a {} account",
                existing.email, existing.role
            ))),
            None => {
                let identity = Identity::new(Role::Admin, name, email, hash_password(password)?);
                let email = identity.email.clone();
                self.store.insert_identity(identity).await?;
                info!("Created bootstrap admin {}", email);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{password::legacy_digest, JwtValidator};
    use crate::services::ClinicConfig;
    use crate::store::{ClinicStore, MemoryStore};
    use std::sync::Arc;

    fn clinic(allow_admin_registration: bool) -> Clinic {
        Clinic::new(
            Arc::new(MemoryStore::new()),
            JwtValidator::new_dev(),
            ClinicConfig {
                allow_admin_registration,
            },
        )
    }

    fn request(email: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ann".into(),
            email: email.into(),
            password: "password123".into(),
            role: role.into(),
        }
    }

    #[tokio::test]
    async fn test_register_validation() {
        let clinic = clinic(false);

        let mut blank_name = request("a@x.com", "Patient");
        blank_name.name = "  ".into();
        assert!(matches!(
            clinic.register(blank_name).await,
            Err(ClinicError::Validation(_))
        ));

        let mut short = request("a@x.com", "Patient");
        short.password = "short".into();
        assert!(matches!(
            clinic.register(short).await,
            Err(ClinicError::Validation(_))
        ));

        assert!(matches!(
            clinic.register(request("a@x.com", "Nurse")).await,
            Err(ClinicError::Validation(_))
        ));
        assert!(matches!(
            clinic.register(request("a@x.com", "Doctor")).await,
            Err(ClinicError::Validation(_))
        ));
        assert!(matches!(
            clinic.register(request("a@x.com", "Admin")).await,
            Err(ClinicError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_registration_when_enabled() {
        let clinic = clinic(true);
        let admin = clinic.register(request("boss@x.com", "Admin")).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_legacy_hash_upgraded_on_login() {
        let clinic = clinic(false);
        let identity = Identity::new(
            Role::Patient,
            "Old".into(),
            "old@x.com".into(),
            legacy_digest("password123"),
        );
        let id = identity.id;
        clinic.store().insert_identity(identity).await.unwrap();

        let response = clinic
            .login(LoginRequest {
                email: "old@x.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.identity_id, id);

        let stored = clinic.store().identity_by_id(id).await.unwrap().unwrap();
        assert!(stored.password_hash.starts_with("$argon2"));

        // Still logs in with the upgraded hash
        assert!(clinic
            .login(LoginRequest {
                email: "OLD@x.com".into(),
                password: "password123".into(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_alike() {
        let clinic = clinic(false);
        clinic.register(request("p@x.com", "Patient")).await.unwrap();

        let unknown = clinic
            .login(LoginRequest {
                email: "nobody@x.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        let wrong = clinic
            .login(LoginRequest {
                email: "p@x.com".into(),
                password: "password124".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(unknown, ClinicError::Authentication(_)));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_ensure_admin() {
        let clinic = clinic(false);
        clinic
            .ensure_admin("Root", "root@x.com", "password123")
            .await
            .unwrap();
        // Idempotent
        clinic
            .ensure_admin("Root", "root@x.com", "password123")
            .await
            .unwrap();

        clinic.register(request("p@x.com", "Patient")).await.unwrap();
        assert!(matches!(
            clinic.ensure_admin("Root", "p@x.com", "password123").await,
            Err(ClinicError::Config(_))
        ));
    }
}
