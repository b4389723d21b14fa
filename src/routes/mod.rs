//! HTTP routes for the clinic
//!
//! Each area (`/api/auth`, `/api/admin`, `/api/doctor`, `/api/patient`)
//! has its own dispatcher returning `None` for paths it does not own.
//! The helpers below are shared by all of them.

pub mod admin;
pub mod auth_routes;
pub mod doctor;
pub mod health;
pub mod patient;

pub use admin::handle_admin_request;
pub use auth_routes::handle_auth_request;
pub use doctor::handle_doctor_request;
pub use health::{health_check, version_info};
pub use patient::handle_patient_request;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, AUTHORIZATION, CONTENT_TYPE,
};
use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::types::ClinicError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

// =============================================================================
// Response Helpers
// =============================================================================

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

fn with_cors(mut response: Response<BoxBody>) -> Response<BoxBody> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    with_cors(response)
}

pub fn no_content() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    with_cors(response)
}

pub fn cors_preflight() -> Response<BoxBody> {
    let mut response = no_content();
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Map a service error onto its HTTP status and `{"error","code"}` body
pub fn error_response(err: ClinicError) -> Response<BoxBody> {
    let status = err.status_code();
    let body = ErrorBody {
        code: err.code(),
        error: err.to_string(),
    };

    if status.is_server_error() {
        error!("Request failed: {}", body.error);
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!("Request denied: {}", body.error);
    } else {
        debug!("Request rejected: {}", body.error);
    }

    json_response(status, &body)
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed", "code": "METHOD_NOT_ALLOWED" }),
    )
}

pub fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "Not Found", "code": "NOT_FOUND", "path": path }),
    )
}

/// Flatten a handler result into a response
pub fn respond(result: Result<Response<BoxBody>, ClinicError>) -> Response<BoxBody> {
    result.unwrap_or_else(error_response)
}

// =============================================================================
// Request Helpers
// =============================================================================

pub async fn parse_json_body<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, ClinicError> {
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| ClinicError::Validation(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    serde_json::from_slice(&bytes)
        .map_err(|e| ClinicError::Validation(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Decode the query string into `T`; an absent query decodes from ""
pub fn parse_query<T: DeserializeOwned>(req: &Request<Incoming>) -> Result<T, ClinicError> {
    serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| ClinicError::Validation(format!("Invalid query string: {}", e)))
}

/// Non-empty path segments, for slice-pattern routing
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Parse an id taken from the path
pub fn path_id(raw: &str) -> Result<Uuid, ClinicError> {
    Uuid::parse_str(raw).map_err(|_| ClinicError::Validation(format!("Invalid id '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("/api/doctor/appointments/abc/status"),
            vec!["api", "doctor", "appointments", "abc", "status"]
        );
        assert_eq!(segments("/api/patient/doctors/"), vec!["api", "patient", "doctors"]);
        assert!(segments("/").is_empty());
    }

    #[test]
    fn test_path_id() {
        let id = Uuid::new_v4();
        assert_eq!(path_id(&id.to_string()).unwrap(), id);
        assert!(matches!(path_id("42"), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn test_error_response_status_and_body() {
        let response = error_response(ClinicError::NotFound("Appointment not found".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );

        let response = error_response(ClinicError::Conflict("x".into()));
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_query_decoding() {
        #[derive(Deserialize)]
        struct Q {
            specialty: Option<String>,
        }
        let q: Q = serde_urlencoded::from_str("specialty=Family%20Medicine").unwrap();
        assert_eq!(q.specialty.as_deref(), Some("Family Medicine"));
        let q: Q = serde_urlencoded::from_str("").unwrap();
        assert!(q.specialty.is_none());
    }
}
