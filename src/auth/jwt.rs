//! JWT session tokens
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - Default expiry is 1 hour
//! - The issuer claim must match the configured issuer
//! - No clock skew is tolerated: a token is rejected once `now >= exp`

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::Role;
use crate::types::ClinicError;

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime (30 days)
pub const MAX_EXPIRY_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Payload stored in JWT token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id of the subject
    pub sub: Uuid,
    /// Email at issue time (informational only, never used for lookups)
    pub email: String,
    pub role: Role,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Input for creating a new token
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub identity_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    issuer: String,
    expiry_seconds: u64,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("issuer", &self.issuer)
            .field("expiry_seconds", &self.expiry_seconds)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, issuer: String, expiry_seconds: u64) -> Result<Self, ClinicError> {
        if secret.is_empty() {
            return Err(ClinicError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(ClinicError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        if issuer.trim().is_empty() {
            return Err(ClinicError::Config("JWT issuer must not be empty".into()));
        }

        if expiry_seconds == 0 || expiry_seconds > MAX_EXPIRY_SECONDS {
            return Err(ClinicError::Config(format!(
                "JWT expiry must be between 1 and {} seconds",
                MAX_EXPIRY_SECONDS
            )));
        }

        Ok(Self {
            secret,
            issuer,
            expiry_seconds,
        })
    }

    /// Create a validator for dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            issuer: "clinic-dev".into(),
            expiry_seconds: 3600,
        }
    }

    /// Generate a JWT token for an authenticated identity
    pub fn generate_token(&self, input: TokenInput) -> Result<IssuedToken, ClinicError> {
        self.generate_token_at(input, now_secs()?)
    }

    /// Generate a token as if issued at `now` (Unix seconds)
    pub fn generate_token_at(&self, input: TokenInput, now: u64) -> Result<IssuedToken, ClinicError> {
        let exp = now
            .checked_add(self.expiry_seconds)
            .ok_or_else(|| ClinicError::Config("JWT expiry overflows the clock".into()))?;

        let claims = Claims {
            sub: input.identity_id,
            email: input.email,
            role: input.role,
            iss: self.issuer.clone(),
            iat: now,
            exp,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ClinicError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify and decode a JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ClinicError> {
        self.verify_token_at(token, now_secs()?)
    }

    /// Verify a token against an explicit clock value (Unix seconds)
    pub fn verify_token_at(&self, token: &str, now: u64) -> Result<Claims, ClinicError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Expiry is checked below against `now`, with an inclusive boundary
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => token_data.claims,
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    ErrorKind::InvalidIssuer => "Invalid issuer",
                    ErrorKind::MissingRequiredClaim(_) => "Missing required claim",
                    _ => "Token validation failed",
                };
                return Err(ClinicError::Authentication(error_msg.into()));
            }
        };

        if now >= claims.exp {
            return Err(ClinicError::Authentication("Token expired".into()));
        }

        Ok(claims)
    }
}

/// Extract token from Authorization header.
/// Only the "Bearer <token>" format is accepted.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn now_secs() -> Result<u64, ClinicError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| ClinicError::Internal(format!("System time error: {}", e)))
}
