//! Patient routes
//!
//! Endpoints (role Patient):
//! - GET /api/patient/doctors
//! - GET /api/patient/doctors/search-by-specialty?specialty=
//! - GET /api/patient/doctors/search-by-location?location=
//! - GET/POST /api/patient/appointments
//! - PUT /api/patient/appointments/{id}/cancel
//! - GET /api/patient/prescriptions

use hyper::{body::Incoming, Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    get_auth_header, json_response, method_not_allowed, parse_json_body, parse_query, path_id,
    respond, segments, BoxBody,
};
use crate::server::AppState;
use crate::services::BookAppointmentRequest;
use crate::types::ClinicError;

#[derive(Debug, Default, Deserialize)]
struct SpecialtyQuery {
    #[serde(default)]
    specialty: String,
}

#[derive(Debug, Default, Deserialize)]
struct LocationQuery {
    #[serde(default)]
    location: String,
}

async fn list_doctors(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let doctors = state.clinic.patient_list_doctors(&claims).await?;
    Ok(json_response(StatusCode::OK, &doctors))
}

async fn search_by_specialty(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let query: SpecialtyQuery = parse_query(&req)?;
    let doctors = state
        .clinic
        .patient_search_by_specialty(&claims, &query.specialty)
        .await?;
    Ok(json_response(StatusCode::OK, &doctors))
}

async fn search_by_location(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let query: LocationQuery = parse_query(&req)?;
    let doctors = state
        .clinic
        .patient_search_by_location(&claims, &query.location)
        .await?;
    Ok(json_response(StatusCode::OK, &doctors))
}

async fn book_appointment(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let request: BookAppointmentRequest = parse_json_body(req).await?;
    let appointment = state
        .clinic
        .patient_book_appointment(&claims, request)
        .await?;
    Ok(json_response(StatusCode::CREATED, &appointment))
}

async fn list_appointments(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let appointments = state.clinic.patient_list_appointments(&claims).await?;
    Ok(json_response(StatusCode::OK, &appointments))
}

async fn cancel_appointment(
    req: Request<Incoming>,
    state: &AppState,
    raw_id: &str,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let id = path_id(raw_id)?;
    let appointment = state.clinic.patient_cancel(&claims, id).await?;
    Ok(json_response(StatusCode::OK, &appointment))
}

async fn list_prescriptions(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>, ClinicError> {
    let claims = state.clinic.authenticate(get_auth_header(&req))?;
    let prescriptions = state.clinic.patient_list_prescriptions(&claims).await?;
    Ok(json_response(StatusCode::OK, &prescriptions))
}

/// Dispatch /api/patient/* requests; `None` for paths outside this area
pub async fn handle_patient_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, segments(&path).as_slice()) {
        (&Method::GET, ["api", "patient", "doctors"]) => list_doctors(req, &state).await,
        (&Method::GET, ["api", "patient", "doctors", "search-by-specialty"]) => {
            search_by_specialty(req, &state).await
        }
        (&Method::GET, ["api", "patient", "doctors", "search-by-location"]) => {
            search_by_location(req, &state).await
        }
        (&Method::POST, ["api", "patient", "appointments"]) => {
            book_appointment(req, &state).await
        }
        (&Method::GET, ["api", "patient", "appointments"]) => {
            list_appointments(req, &state).await
        }
        (&Method::PUT, ["api", "patient", "appointments", id, "cancel"]) => {
            cancel_appointment(req, &state, id).await
        }
        (&Method::GET, ["api", "patient", "prescriptions"]) => {
            list_prescriptions(req, &state).await
        }
        (_, ["api", "patient", "doctors"])
        | (_, ["api", "patient", "doctors", "search-by-specialty"])
        | (_, ["api", "patient", "doctors", "search-by-location"])
        | (_, ["api", "patient", "appointments"])
        | (_, ["api", "patient", "appointments", _, "cancel"])
        | (_, ["api", "patient", "prescriptions"]) => Ok(method_not_allowed()),
        _ => return None,
    };

    Some(respond(result))
}
