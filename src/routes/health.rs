//! Health and version endpoints
//!
//! - /health, /healthz - Liveness probe; 200 whenever the process is serving
//! - /version - Build information baked in by build.rs

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    /// Backing record store: "mongodb" or "memory"
    pub store: &'static str,
    pub dev_mode: bool,
    pub registration_open: bool,
    pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        store: state.store_kind.as_str(),
        dev_mode: state.args.dev_mode,
        registration_open: true,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: &AppState) -> Response<BoxBody> {
    json_response(StatusCode::OK, &build_health_response(state))
}

/// Handle /version
pub fn version_info() -> Response<BoxBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "clinic",
    };
    json_response(StatusCode::OK, &response)
}
