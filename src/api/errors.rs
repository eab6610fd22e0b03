//! Application error hierarchy.
//!
//! Every failure a handler can produce maps onto one `AppError` variant, and
//! every variant renders the `{"success": false, "message": ...}` envelope
//! with the matching status code. Internal failures are logged with a trace
//! id and answered with a generic message; stack detail never reaches the
//! client.

use actix_web::{HttpResponse, ResponseError};
use std::error::Error;
use thiserror::Error;

/// Application error taxonomy.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database error carrying the failed operation for the log.
    #[error("database error in operation '{operation}': {source}")]
    Database {
        operation: String,
        #[source]
        source: mongodb::error::Error,
    },

    /// Malformed, missing or out-of-range input. Always user-correctable.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credentials, insufficient rights (wrong role, deactivated
    /// account).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Overlapping booking or unavailable room.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Outbound email delivery failed.
    #[error("mail delivery failed: {0}")]
    Mail(String),

    /// Unexpected internal error with a trace id for correlation.
    #[error("internal error (trace: {trace_id}): {message}")]
    InternalWithTrace { trace_id: String, message: String },

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Database error with operation context.
    pub fn database(operation: &str, source: mongodb::error::Error) -> Self {
        Self::Database {
            operation: operation.to_string(),
            source,
        }
    }

    /// Internal error tagged with a fresh trace id.
    pub fn internal_trace(message: &str) -> Self {
        Self::InternalWithTrace {
            trace_id: uuid::Uuid::new_v4().to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

fn envelope(message: &str) -> ErrorBody {
    ErrorBody {
        success: false,
        message: message.to_string(),
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Database { operation, source } => {
                tracing::error!(
                    operation = %operation,
                    error = %source,
                    error_chain = ?source.source(),
                    "Database error occurred"
                );
                HttpResponse::InternalServerError().json(envelope("Server error. Please try again."))
            }
            Self::Validation(message) => {
                tracing::warn!(message = %message, "Validation error");
                HttpResponse::BadRequest().json(envelope(message))
            }
            Self::Unauthorized(message) => {
                tracing::warn!(message = %message, "Unauthorized request");
                HttpResponse::Unauthorized().json(envelope(message))
            }
            Self::Forbidden(message) => {
                tracing::warn!(message = %message, "Forbidden request");
                HttpResponse::Forbidden().json(envelope(message))
            }
            Self::NotFound(message) => {
                tracing::info!(message = %message, "Resource not found");
                HttpResponse::NotFound().json(envelope(message))
            }
            Self::Conflict(message) => {
                // conflicts answer 400, not 409
                tracing::info!(message = %message, "Booking conflict");
                HttpResponse::BadRequest().json(envelope(message))
            }
            Self::Mail(message) => {
                tracing::error!(message = %message, "Email delivery failed");
                HttpResponse::InternalServerError().json(envelope(message))
            }
            Self::InternalWithTrace { trace_id, message } => {
                tracing::error!(
                    trace_id = %trace_id,
                    message = %message,
                    "Internal error with trace"
                );
                HttpResponse::InternalServerError().json(envelope("Server error. Please try again."))
            }
            Self::Internal(message) => {
                tracing::error!(message = %message, "Internal error");
                HttpResponse::InternalServerError().json(envelope("Server error. Please try again."))
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<mongodb::error::Error> for AppError {
    fn from(error: mongodb::error::Error) -> Self {
        Self::Database {
            operation: "database_operation".to_string(),
            source: error,
        }
    }
}

impl From<mongodb::bson::oid::Error> for AppError {
    fn from(e: mongodb::bson::oid::Error) -> Self {
        Self::Validation(format!("Invalid id: {}", e))
    }
}
