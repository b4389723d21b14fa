//! Configuration for the clinic server
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

use crate::auth::jwt::{MAX_EXPIRY_SECONDS, MIN_SECRET_LEN};
use crate::services::ClinicConfig;

/// Clinic - appointment booking backend for admins, doctors and patients
#[derive(Parser, Debug, Clone)]
#[command(name = "clinic")]
#[command(about = "Role-gated clinic appointment booking server")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5111")]
    pub listen: SocketAddr,

    /// Enable development mode (dev signing secret, in-memory store fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "clinic")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT issuer claim
    #[arg(long, env = "JWT_ISSUER", default_value = "clinic")]
    pub jwt_issuer: String,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Allow self-registration with role Admin
    #[arg(long, env = "ALLOW_ADMIN_REGISTRATION", default_value = "false")]
    pub allow_admin_registration: bool,

    /// Bootstrap admin email, created at startup if missing
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Bootstrap admin password
    #[arg(long, env = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,

    /// Bootstrap admin display name
    #[arg(long, env = "ADMIN_NAME", default_value = "Administrator")]
    pub admin_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

/// Credentials for the admin seeded at startup
#[derive(Debug, Clone)]
pub struct BootstrapAdmin<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl Args {
    /// Policy switches handed to the clinic service
    pub fn clinic_config(&self) -> ClinicConfig {
        ClinicConfig {
            allow_admin_registration: self.allow_admin_registration,
        }
    }

    /// Bootstrap admin, if both email and password are configured
    pub fn bootstrap_admin(&self) -> Option<BootstrapAdmin<'_>> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: &self.admin_name,
                email,
                password,
            }),
            _ => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None if !self.dev_mode => {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "JWT_SECRET must be at least {} bytes",
                    MIN_SECRET_LEN
                ));
            }
            _ => {}
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        if self.jwt_expiry_seconds > MAX_EXPIRY_SECONDS {
            return Err(format!(
                "JWT_EXPIRY_SECONDS must be at most {} (30 days)",
                MAX_EXPIRY_SECONDS
            ));
        }

        if self.admin_email.is_some() != self.admin_password.is_some() {
            return Err("ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["clinic"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.listen.port(), 5111);
        assert_eq!(args.mongodb_db, "clinic");
        assert_eq!(args.jwt_issuer, "clinic");
        assert_eq!(args.jwt_expiry_seconds, 3600);
        assert!(!args.allow_admin_registration);
        assert!(args.bootstrap_admin().is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_secret_required_outside_dev_mode() {
        let mut args = parse(&["--dev-mode"]);
        args.dev_mode = false;
        args.jwt_secret = None;
        assert!(args.validate().is_err());

        args.jwt_secret = Some(SECRET.into());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let args = parse(&["--jwt-secret", "short"]);
        assert!(args.validate().unwrap_err().contains("at least"));
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let args = parse(&["--jwt-secret", SECRET, "--jwt-expiry-seconds", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_expiry_capped_at_thirty_days() {
        let max = MAX_EXPIRY_SECONDS.to_string();
        let args = parse(&["--jwt-secret", SECRET, "--jwt-expiry-seconds", &max]);
        assert!(args.validate().is_ok());

        let huge = u64::MAX.to_string();
        let args = parse(&["--jwt-secret", SECRET, "--jwt-expiry-seconds", &huge]);
        assert!(args.validate().unwrap_err().contains("at most"));
    }

    #[test]
    fn test_bootstrap_admin_needs_both_fields() {
        let half = parse(&["--dev-mode", "--admin-email", "root@x.com"]);
        assert!(half.validate().is_err());

        let full = parse(&[
            "--dev-mode",
            "--admin-email",
            "root@x.com",
            "--admin-password",
            "password123",
        ]);
        assert!(full.validate().is_ok());
        let admin = full.bootstrap_admin().unwrap();
        assert_eq!(admin.email, "root@x.com");
        assert_eq!(admin.name, "Administrator");
    }
}
