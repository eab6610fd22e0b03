//! REST API module.
//!
//! All routes and handlers of the booking backend:
//!
//! - [`admin_auth`] - Administrator login, profile, password and OTP flow
//! - [`user_auth`] - Guest accounts (register, lockout-guarded login)
//! - [`booking`] - Booking lifecycle and availability checks
//! - [`room`] - Room inventory (public and admin variants)
//! - [`errors`] - Application error taxonomy
//! - [`middleware`] - Bearer-token authentication guard

pub mod admin_auth;
pub mod booking;
pub mod errors;
pub mod middleware;
pub mod room;
pub mod user_auth;

pub use errors::{AppError, AppResult};

use actix_web::web;

/// Registers every route of the API.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    admin_auth::routes(cfg);
    user_auth::routes(cfg);
    booking::routes(cfg);
    room::routes(cfg);
}
