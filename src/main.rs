//! # Aamantran Booking Server
//!
//! Booking-management backend for the Aamantran Homestay, built with Rust,
//! Actix Web and MongoDB.
//!
//! ## Main features
//!
//! - **Room inventory**: public catalogue and admin management
//! - **Bookings**: validation rules, date-conflict detection, lifecycle
//!   (pending/confirmed/cancelled/completed), availability checks
//! - **Admin authentication**: JWT sessions, OTP-based password reset
//! - **Guest accounts**: registration and lockout-guarded login
//! - **Email**: OTP and new-booking notifications over SMTP
//!
//! ## Configuration
//!
//! The server is configured through environment variables (`.env` file):
//!
//! ```env
//! # MongoDB
//! MONGODB_URI=mongodb://localhost:27017
//! MONGODB_DATABASE=aamantran_booking
//!
//! # Server
//! BIND_ADDRESS=0.0.0.0:8080
//!
//! # Auth
//! JWT_SECRET=change-me
//!
//! # Email
//! SMTP_HOST=smtp.gmail.com
//! EMAIL_USER=bookings@example.com
//! EMAIL_PASSWORD=app-password
//! ADMIN_EMAIL=owner@example.com
//!
//! # Logging
//! RUST_LOG=debug,mongodb=info
//! ```

use actix_web::{middleware::Logger, web, App, HttpServer};
use std::env;
use std::sync::Arc;

mod api;
mod auth;
mod conflict;
mod db;
mod email;
mod otp;
mod validation;

use crate::auth::JwtKeys;
use crate::otp::{InMemoryOtpStore, OtpStore};

/// Entry point.
///
/// 1. Loads environment variables from `.env`
/// 2. Initializes tracing with the default directives
/// 3. Connects to MongoDB and creates indexes (non-fatal on failure)
/// 4. Builds the shared state: JWT keys, SMTP mailer, OTP store
/// 5. Starts the HTTP server with logging middleware and all API routes
///
/// # Errors
///
/// Returns `std::io::Error` when MongoDB is unreachable, the mailer cannot
/// be configured, or the bind address is taken.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aamantran_booking=debug".parse().unwrap())
                .add_directive("mongodb=info".parse().unwrap()),
        )
        .init();

    tracing::info!("Starting Aamantran Booking Server...");

    let mongo_repo = match db::MongoRepo::init().await {
        Ok(repo) => {
            if let Err(e) = repo.create_indexes().await {
                // not fatal, the queries work without indexes
                tracing::warn!("Warning creating indexes: {}", e);
            }
            repo
        }
        Err(e) => {
            tracing::error!("Error connecting to MongoDB: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("MongoDB error: {}", e),
            ));
        }
    };

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using a development default");
        "your-secret-key".to_string()
    });
    let jwt_keys = JwtKeys::from_secret(&jwt_secret);

    let mailer = match email::Mailer::from_env() {
        Ok(mailer) => mailer,
        Err(e) => {
            tracing::error!("Error configuring mailer: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Mailer error: {}", e),
            ));
        }
    };

    // process-local store; swap for a shared implementation when running
    // more than one instance
    let otp_store: Arc<dyn OtpStore> = Arc::new(InMemoryOtpStore::new());
    let otp_store = web::Data::from(otp_store);

    let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Server starting on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(mongo_repo.clone()))
            .app_data(web::Data::new(jwt_keys.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .app_data(otp_store.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                // malformed bodies answer with the same envelope as every
                // other validation failure
                api::AppError::Validation(err.to_string()).into()
            }))
            .wrap(Logger::default())
            .configure(api::init_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
