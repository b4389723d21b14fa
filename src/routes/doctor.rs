//! Doctor routes
//!
//! Endpoints (role Doctor, own appointments only):
//! - GET /api/doctor/appointments
//! - PUT /api/doctor/appointments/{id}/status - body `"Approved"` or `{"status": "Rejected"}`
//! - POST /api/doctor/appointments/{id}/prescription - body `"notes"` or `{"notes": "..."}`

use hyper::{body::Incoming, Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    get_auth_header, json_response, method_not_allowed, parse_json_body, path_id, respond,
    segments, BoxBody,
};
use crate::server::AppState;
use crate::types::ClinicError;

/// Accepts a bare JSON string or an object wrapping it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusBody {
    Bare(String),
    Wrapped { status: String },
}

impl StatusBody {
    fn into_inner(self) -> String {
        match self {
            StatusBody::Bare(s) | StatusBody::Wrapped { status: s } => s,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NotesBody {
    Bare(String),
    Wrapped { notes: String },
}

impl NotesBody {
    fn into_inner(self) -> String {
        match self {
            NotesBody::Bare(s) | NotesBody::Wrapped { notes: s } => s,
        }
    }
}

async fn list_appointments(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let appointments = state.clinic.doctor_list_appointments(&claims).await?;
    Ok(json_response(StatusCode::OK, &appointments))
}

async fn set_status(
    req: Request<Incoming>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let id = path_id(raw_id)?;
    let body: StatusBody = parse_json_body(req).await?;
    let appointment = state
        .clinic
        .doctor_set_status(&claims, id, &body.into_inner())
        .await?;
    Ok(json_response(StatusCode::OK, &appointment))
}

async fn add_prescription(
    req: Request<Incoming>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let id = path_id(raw_id)?;
    let body: NotesBody = parse_json_body(req).await?;
    let prescription = state
        .clinic
        .doctor_add_prescription(&claims, id, &body.into_inner())
        .await?;
    Ok(json_response(StatusCode::CREATED, &prescription))
}

/// Dispatch /api/doctor/* requests; `None` for paths outside this area
pub async fn handle_doctor_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, segments(&path).as_slice()) {
        (&Method::GET, ["api", "doctor", "appointments"]) => list_appointments(req, &state).await,
        (&Method::PUT, ["api", "doctor", "appointments", id, "status"]) => {
            set_status(req, &state, id).await
        }
        (&Method::POST, ["api", "doctor", "appointments", id, "prescription"]) => {
            add_prescription(req, &state, id).await
        }
        (_, ["api", "doctor", "appointments"])
        | (_, ["api", "doctor", "appointments", _, "status"])
        | (_, ["api", "doctor", "appointments", _, "prescription"]) => Ok(method_not_allowed()),
        _ => return None,
    };

    Some(respond(result))
}
