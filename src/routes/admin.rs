//! Admin routes
//!
//! Endpoints (role Admin):
//! - GET/POST /api/admin/doctors
//! - PUT/DELETE /api/admin/doctors/{id}
//! - GET /api/admin/appointments
//! - GET /api/admin/appointments/count-by-doctor
//! - GET /api/admin/appointments/count-by-patient

use hyper::{body::Incoming, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    get_auth_header, json_response, method_not_allowed, parse_json_body, path_id, respond,
    segments, BoxBody,
};
use crate::server::AppState;
use crate::services::{AddDoctorRequest, EditDoctorRequest};
use crate::types::ClinicError;

#[derive(Serialize)]
struct DeletedResponse {
    message: &'static str,
    id: Uuid,
}

async fn list_doctors(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let doctors = state.clinic.admin_list_doctors(&claims).await?;
    Ok(json_response(StatusCode::OK, &doctors))
}

async fn add_doctor(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let request: AddDoctorRequest = parse_json_body(req).await?;
    let doctor = state.clinic.admin_add_doctor(&claims, request).await?;
    Ok(json_response(StatusCode::CREATED, &doctor))
}

async fn edit_doctor(
    req: Request<Incoming>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let id = path_id(raw_id)?;
    let request: EditDoctorRequest = parse_json_body(req).await?;
    let doctor = state.clinic.admin_edit_doctor(&claims, id, request).await?;
    Ok(json_response(StatusCode::OK, &doctor))
}

async fn delete_doctor(
    req: Request<Incoming>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let id = path_id(raw_id)?;
    state.clinic.admin_delete_doctor(&claims, id).await?;
    Ok(json_response(
        StatusCode::OK,
        &DeletedResponse {
            message: "Doctor deleted",
            id,
        },
    ))
}

async fn list_appointments(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let appointments = state.clinic.admin_list_appointments(&claims).await?;
    Ok(json_response(StatusCode::OK, &appointments))
}

async fn count_by_doctor(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let counts = state.clinic.admin_count_by_doctor(&claims).await?;
    Ok(json_response(StatusCode::OK, &counts))
}

async fn count_by_patient(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let counts = state.clinic.admin_count_by_patient(&claims).await?;
    Ok(json_response(StatusCode::OK, &counts))
}

/// Dispatch /api/admin/* requests; `None` for paths outside this area
pub async fn handle_admin_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, segments(&path).as_slice()) {
        (&Method::GET, ["api", "admin", "doctors"]) => list_doctors(req, &state).await,
        (&Method::POST, ["api", "admin", "doctors"]) => add_doctor(req, &state).await,
        (&Method::PUT, ["api", "admin", "doctors", id]) => edit_doctor(req, &state, id).await,
        (&Method::DELETE, ["api", "admin", "doctors", id]) => {
            delete_doctor(req, &state, id).await
        }
        (&Method::GET, ["api", "admin", "appointments"]) => list_appointments(req, &state).await,
        (&Method::GET, ["api", "admin", "appointments", "count-by-doctor"]) => {
            count_by_doctor(req, &state).await
        }
        (&Method::GET, ["api", "admin", "appointments", "count-by-patient"]) => {
            count_by_patient(req, &state).await
        }
        (_, ["api", "admin", "doctors"])
        | (_, ["api", "admin", "doctors", _])
        | (_, ["api", "admin", "appointments"])
        | (_, ["api", "admin", "appointments", "count-by-doctor"])
        | (_, ["api", "admin", "appointments", "count-by-patient"]) => Ok(method_not_allowed()),
        _ => return None,
    };

    Some(respond(result))
}
