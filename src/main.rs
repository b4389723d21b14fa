//! Clinic appointment booking server

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic::{
    auth::JwtValidator,
    config::Args,
    db::{MongoClient, MongoStore},
    server::{self, AppState, StoreKind},
    store::{ClinicStore, MemoryStore},
    Clinic,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("clinic={},info", log_level).into());
    tracing_subscriber::registry()
        .with(filter)
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Clinic appointment server");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    info!("Token issuer: {} ({}s expiry)", args.jwt_issuer, args.jwt_expiry_seconds);
    info!("======================================");

    let jwt = match &args.jwt_secret {
        Some(secret) => JwtValidator::new(
            secret.clone(),
            args.jwt_issuer.clone(),
            args.jwt_expiry_seconds,
        )?,
        None => {
            warn!("No JWT_SECRET configured - using the insecure development secret");
            JwtValidator::new_dev()
        }
    };

    // Connect to MongoDB (in-memory fallback in dev mode)
    let (store, store_kind): (Arc<dyn ClinicStore>, StoreKind) =
        match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("MongoDB connected successfully");
                (Arc::new(MongoStore::new(&client).await?), StoreKind::Mongo)
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                    (Arc::new(MemoryStore::new()), StoreKind::Memory)
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    let clinic = Clinic::new(store, jwt, args.clinic_config());

    if let Some(admin) = args.bootstrap_admin() {
        clinic
            .ensure_admin(admin.name, admin.email, admin.password)
            .await?;
    }

    let state = Arc::new(AppState::new(args, clinic, store_kind));
    server::run(state).await?;

    Ok(())
}
