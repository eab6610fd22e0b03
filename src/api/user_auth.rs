//! End-user authentication API.
//!
//! Guest accounts own their bookings (`/api/bookings/my-bookings`). Login is
//! guarded by the lockout counters on the user document: five consecutive
//! failures lock the account for two hours, and a locked account is rejected
//! before the password is even checked.

use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;
use mongodb::bson::{doc, Bson, DateTime};
use serde::Deserialize;
use serde_json::json;

use super::middleware::ErrorLogExt;
use super::{AppError, AppResult};
use crate::auth::{self, JwtKeys, MIN_PASSWORD_LENGTH};
use crate::db::models::User;
use crate::db::MongoRepo;
use crate::validation::{self, normalize_email};

#[derive(Deserialize)]
struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    phone: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

fn user_summary(user: &User) -> serde_json::Value {
    json!({
        "id": user.id.unwrap().to_hex(),
        "name": user.name,
        "email": user.email,
        "role": user.role.as_str(),
    })
}

/// Persists the lockout bookkeeping fields after a login attempt.
async fn save_login_state(repo: &MongoRepo, user: &User) -> AppResult<()> {
    let lock_until = user
        .lock_until
        .map(Bson::DateTime)
        .unwrap_or(Bson::Null);

    repo.users()
        .update_one(
            doc! { "_id": user.id.unwrap() },
            doc! { "$set": {
                "loginAttempts": user.login_attempts,
                "lockUntil": lock_until,
                "updatedAt": DateTime::now(),
            } },
        )
        .await
        .map_err(|e| AppError::database("save_login_state", e))?;
    Ok(())
}

/// Registers a guest account.
#[post("/api/auth/register")]
async fn register(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    data: web::Json<RegisterRequest>,
) -> AppResult<impl Responder> {
    let (Some(name), Some(email), Some(password)) = (&data.name, &data.email, &data.password)
    else {
        return Err(AppError::Validation(
            "Please provide name, email and password".to_string(),
        ));
    };

    let name = name.trim();
    if name.chars().count() < 2 {
        return Err(AppError::Validation(
            "Name must be at least 2 characters".to_string(),
        ));
    }
    if name.chars().count() > 100 {
        return Err(AppError::Validation(
            "Name cannot exceed 100 characters".to_string(),
        ));
    }

    validation::email(email)?;

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    if let Some(phone) = &data.phone {
        let digits = phone.chars().all(|c| c.is_ascii_digit());
        if !digits || !(10..=15).contains(&phone.chars().count()) {
            return Err(AppError::Validation(
                "Please enter a valid phone number (10-15 digits)".to_string(),
            ));
        }
    }

    let email = normalize_email(email);
    let existing = repo
        .users()
        .find_one(doc! { "email": &email })
        .await
        .log_error_context("checking if user exists")
        .map_err(|e| AppError::database("check_user_exists", e))?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "An account already exists with this email".to_string(),
        ));
    }

    let user = User::new(name, &email, password, data.phone.clone())?;

    let result = repo
        .users()
        .insert_one(&user)
        .await
        .log_error_context("inserting new user")
        .map_err(|e| AppError::database("register_user", e))?;

    let user_id = result.inserted_id.as_object_id().unwrap();
    let token = auth::sign_session_token(&keys, &user_id.to_hex(), &email, user.role.as_str())?;

    tracing::info!(email = %email, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Account created successfully",
        "token": token,
        "user": {
            "id": user_id.to_hex(),
            "name": user.name,
            "email": user.email,
            "role": user.role.as_str(),
        },
    })))
}

/// Authenticates a guest account, maintaining the lockout counters.
///
/// A locked account is rejected before the password check; a failed check
/// increments the counter (locking at the fifth); a success resets it.
#[post("/api/auth/login")]
async fn login(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    data: web::Json<LoginRequest>,
) -> AppResult<impl Responder> {
    let (Some(email), Some(password)) = (&data.email, &data.password) else {
        return Err(AppError::Validation(
            "Please provide email and password".to_string(),
        ));
    };

    let email = normalize_email(email);
    let now = Utc::now();

    let mut user = repo
        .users()
        .find_one(doc! { "email": &email })
        .await
        .log_error_context("looking up user by email")
        .map_err(|e| AppError::database("find_user_by_email", e))?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if user.is_locked(now) {
        return Err(AppError::Forbidden(
            "Account is temporarily locked due to too many failed login attempts. Please try again later.".to_string(),
        ));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    if !user.verify_password(password)? {
        user.register_failed_attempt(now);
        save_login_state(&repo, &user).await?;

        tracing::warn!(
            email = %email,
            attempts = user.login_attempts,
            locked = user.is_locked(now),
            "Failed login attempt"
        );

        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    user.reset_login_attempts();
    save_login_state(&repo, &user).await?;

    let user_id = user.id.unwrap();
    repo.users()
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "lastLogin": DateTime::now() } },
        )
        .await
        .map_err(|e| AppError::database("update_last_login", e))?;

    let token = auth::sign_session_token(&keys, &user_id.to_hex(), &user.email, user.role.as_str())?;

    tracing::info!(email = %email, "User login successful");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": user_summary(&user),
    })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register);
    cfg.service(login);
}
