//! HTTP server implementation
//!
//! Routes:
//! - /health, /healthz - Liveness probe
//! - /version - Build information
//! - /api/auth/* - Register and login
//! - /api/admin/* - Doctor management and reporting (Admin)
//! - /api/doctor/* - Own appointments and prescriptions (Doctor)
//! - /api/patient/* - Discovery, booking, cancellation (Patient)

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::routes::{self, BoxBody};
use crate::services::Clinic;
use crate::types::ClinicError;

/// Which record store backs this instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Mongo,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Mongo => "mongodb",
            StoreKind::Memory => "memory",
        }
    }
}

/// Shared state for all requests
pub struct AppState {
    pub args: Args,
    pub clinic: Clinic,
    pub store_kind: StoreKind,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, clinic: Clinic, store_kind: StoreKind) -> Self {
        Self {
            args,
            clinic,
            store_kind,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server until the listener fails
pub async fn run(state: Arc<AppState>) -> Result<(), ClinicError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Clinic listening on {} ({} store)",
        state.args.listen,
        state.store_kind.as_str()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - do not use in production");
    }
    if state.args.allow_admin_registration {
        warn!("Admin self-registration is enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(routes::cors_preflight());
    }

    match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(routes::health_check(&state));
        }
        (&Method::GET, "/version") => return Ok(routes::version_info()),
        _ => {}
    }

    let response = if path.starts_with("/api/auth/") {
        routes::handle_auth_request(req, state).await
    } else if path.starts_with("/api/admin/") {
        routes::handle_admin_request(req, state).await
    } else if path.starts_with("/api/doctor/") {
        routes::handle_doctor_request(req, state).await
    } else if path.starts_with("/api/patient/") {
        routes::handle_patient_request(req, state).await
    } else {
        None
    };

    Ok(response.unwrap_or_else(|| routes::not_found(&path)))
}
