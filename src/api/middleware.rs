//! Request authentication guard and error-chain logging helpers.
//!
//! Every protected handler calls one of the guards below: the bearer token
//! is verified, the backing account is re-resolved from the database and its
//! active flag re-checked, so a deactivated account is cut off even while
//! its token is still within its 7-day lifetime.

use actix_web::HttpRequest;
use mongodb::bson::{doc, oid::ObjectId};
use std::error::Error as StdError;

use super::{AppError, AppResult};
use crate::auth::{self, Claims, JwtKeys};
use crate::db::models::Admin;
use crate::db::MongoRepo;

/// Extracts the bearer token from the `Authorization` header.
pub fn extract_token(req: &HttpRequest) -> AppResult<String> {
    let auth_header = req.headers().get("authorization").ok_or_else(|| {
        AppError::Unauthorized("No authentication token, access denied".to_string())
    })?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

    if !auth_str.starts_with("Bearer ") {
        return Err(AppError::Unauthorized("Invalid token format".to_string()));
    }

    Ok(auth_str[7..].to_string())
}

/// Verifies the bearer token's signature and expiry, distinguishing the two
/// for the client.
pub fn verify_bearer(keys: &JwtKeys, req: &HttpRequest) -> AppResult<Claims> {
    let token = extract_token(req)?;

    auth::verify_session_token(keys, &token).map_err(|e| {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".to_string()),
            _ => AppError::Unauthorized("Invalid token".to_string()),
        }
    })
}

/// Authenticates any account (admin, host or user) and confirms it still
/// exists and is active.
pub async fn authenticate(repo: &MongoRepo, keys: &JwtKeys, req: &HttpRequest) -> AppResult<Claims> {
    let claims = verify_bearer(keys, req)?;
    let account_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    if claims.role == "admin" {
        let admin = repo
            .admins()
            .find_one(doc! { "_id": account_id })
            .await
            .log_error_context("resolving admin from token")
            .map_err(|e| AppError::database("authenticate", e))?
            .ok_or_else(|| AppError::Unauthorized("Admin not found".to_string()))?;

        if !admin.is_active {
            return Err(AppError::Forbidden("Admin account is deactivated".to_string()));
        }
    } else {
        let user = repo
            .users()
            .find_one(doc! { "_id": account_id })
            .await
            .log_error_context("resolving user from token")
            .map_err(|e| AppError::database("authenticate", e))?
            .ok_or_else(|| AppError::Unauthorized("Account not found".to_string()))?;

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }
    }

    Ok(claims)
}

/// Role gate on already-authenticated claims.
pub fn require_role(claims: &Claims, allowed: &[&str]) -> AppResult<()> {
    if allowed.contains(&claims.role.as_str()) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Access denied. Insufficient permissions.".to_string(),
        ))
    }
}

/// Admin-only guard returning the resolved admin document.
pub async fn authenticate_admin(
    repo: &MongoRepo,
    keys: &JwtKeys,
    req: &HttpRequest,
) -> AppResult<Admin> {
    let claims = verify_bearer(keys, req)?;

    if claims.role != "admin" {
        return Err(AppError::Forbidden("Access denied. Admin only.".to_string()));
    }

    let admin_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    let admin = repo
        .admins()
        .find_one(doc! { "_id": admin_id })
        .await
        .log_error_context("resolving admin from token")
        .map_err(|e| AppError::database("authenticate_admin", e))?
        .ok_or_else(|| AppError::Unauthorized("Admin not found".to_string()))?;

    if !admin.is_active {
        return Err(AppError::Forbidden("Admin account is deactivated".to_string()));
    }

    Ok(admin)
}

/// Logs the full source chain of an error.
pub fn log_error_chain<E>(error: &E, context: Option<&str>)
where
    E: StdError + 'static,
{
    let mut error_chain = Vec::new();
    let mut current_error: Option<&dyn StdError> = Some(error);

    while let Some(err) = current_error {
        error_chain.push(err.to_string());
        current_error = err.source();
    }

    if let Some(ctx) = context {
        tracing::error!(
            context = %ctx,
            error_chain = ?error_chain,
            "Error with full chain (with context)"
        );
    } else {
        tracing::error!(error_chain = ?error_chain, "Error with full chain");
    }
}

/// Extension trait adding error-chain logging to `Result`.
pub trait ErrorLogExt<T, E> {
    /// Logs the error chain, if any, without extra context.
    fn log_error_chain(self) -> Result<T, E>;

    /// Logs the error chain with added context.
    fn log_error_context(self, context: &str) -> Result<T, E>;
}

impl<T, E> ErrorLogExt<T, E> for Result<T, E>
where
    E: StdError + 'static,
{
    fn log_error_chain(self) -> Result<T, E> {
        if let Err(ref error) = self {
            log_error_chain(error, None);
        }
        self
    }

    fn log_error_context(self, context: &str) -> Result<T, E> {
        if let Err(ref error) = self {
            log_error_chain(error, Some(context));
        }
        self
    }
}
