//! Authentication routes
//!
//! Endpoints:
//! - POST /api/auth/register - Create a Patient (or, when enabled, Admin) identity
//! - POST /api/auth/login - Exchange email and password for a bearer token

use hyper::{body::Incoming, Method, Request, Response, StatusCode};
use std::sync::Arc;

use super::{json_response, method_not_allowed, parse_json_body, respond, segments, BoxBody};
use crate::server::AppState;
use crate::services::{LoginRequest, RegisterRequest};
use crate::types::ClinicError;

/// POST /api/auth/register
async fn handle_register(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let request: RegisterRequest = parse_json_body(req).await?;
    let registered = state.clinic.register(request).await?;
    Ok(json_response(StatusCode::CREATED, &registered))
}

/// POST /api/auth/login
async fn handle_login(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let request: LoginRequest = parse_json_body(req).await?;
    let response = state.clinic.login(request).await?;
    Ok(json_response(StatusCode::OK, &response))
}

/// Dispatch /api/auth/* requests; `None` for paths outside this area
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, segments(&path).as_slice()) {
        (&Method::POST, ["api", "auth", "register"]) => handle_register(req, &state).await,
        (&Method::POST, ["api", "auth", "login"]) => handle_login(req, &state).await,
        (_, ["api", "auth", "register"]) | (_, ["api", "auth", "login"]) => {
            Ok(method_not_allowed())
        }
        _ => return None,
    };

    Some(respond(result))
}
