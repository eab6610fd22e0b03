//! Administrator authentication API.
//!
//! Login, profile and password management for the admin panel, plus the
//! forgot-password flow: OTP issuance by email, OTP verification into a
//! short-lived reset token, and the password reset itself.
//!
//! Unknown email and wrong password answer with the same message and status
//! so the login path cannot be used to enumerate accounts. The
//! forgot-password path keeps the original asymmetry: unknown emails get a
//! generic success, deactivated accounts an explicit 403.

use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use mongodb::bson::{doc, DateTime};
use serde::Deserialize;
use serde_json::json;

use super::middleware::{authenticate_admin, ErrorLogExt};
use super::{AppError, AppResult};
use crate::auth::{self, JwtKeys, MIN_PASSWORD_LENGTH};
use crate::db::models::Admin;
use crate::db::MongoRepo;
use crate::email::Mailer;
use crate::otp::{check_otp, generate_otp, OtpCheck, OtpStore, StoredOtp};
use crate::validation::normalize_email;

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct ForgotPasswordRequest {
    email: Option<String>,
}

#[derive(Deserialize)]
struct VerifyOtpRequest {
    email: Option<String>,
    otp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    reset_token: Option<String>,
    new_password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

fn admin_summary(admin: &Admin) -> serde_json::Value {
    json!({
        "id": admin.id.unwrap().to_hex(),
        "name": admin.name,
        "email": admin.email,
        "role": admin.role,
    })
}

async fn find_admin_by_email(repo: &MongoRepo, email: &str) -> AppResult<Option<Admin>> {
    repo.admins()
        .find_one(doc! { "email": email })
        .await
        .log_error_context("looking up admin by email")
        .map_err(|e| AppError::database("find_admin_by_email", e))
}

/// Authenticates an administrator and issues a 7-day session token.
///
/// Unknown email and wrong password are indistinguishable in the response.
#[post("/api/admin/auth/login")]
async fn admin_login(
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
    let admin = find_admin_by_email(&repo, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid admin credentials".to_string()))?;

    if !admin.is_active {
        return Err(AppError::Forbidden(
            "Admin account is deactivated".to_string(),
        ));
    }

    if !admin.verify_password(password)? {
        return Err(AppError::Unauthorized(
            "Invalid admin credentials".to_string(),
        ));
    }

    let admin_id = admin.id.unwrap();
    repo.admins()
        .update_one(
            doc! { "_id": admin_id },
            doc! { "$set": { "lastLogin": DateTime::now(), "updatedAt": DateTime::now() } },
        )
        .await
        .map_err(|e| AppError::database("update_last_login", e))?;

    let token = auth::sign_session_token(&keys, &admin_id.to_hex(), &admin.email, &admin.role)?;

    tracing::info!(email = %admin.email, "Admin login successful");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Admin login successful",
        "token": token,
        "admin": admin_summary(&admin),
    })))
}

/// Starts the forgot-password flow: issues a 10-minute OTP and emails it.
#[post("/api/admin/auth/forgot-password")]
async fn forgot_password(
    repo: web::Data<MongoRepo>,
    otp_store: web::Data<dyn OtpStore>,
    mailer: web::Data<Mailer>,
    data: web::Json<ForgotPasswordRequest>,
) -> AppResult<impl Responder> {
    let Some(email) = &data.email else {
        return Err(AppError::Validation("Email is required".to_string()));
    };
    let email = normalize_email(email);

    let Some(admin) = find_admin_by_email(&repo, &email).await? else {
        // do not reveal whether the email exists
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "If the email exists, an OTP has been sent",
        })));
    };

    if !admin.is_active {
        return Err(AppError::Forbidden(
            "Admin account is deactivated. Contact system administrator.".to_string(),
        ));
    }

    let otp = generate_otp();
    otp_store
        .put(&email, StoredOtp::issued_at(otp.clone(), Utc::now()))
        .await;

    tracing::info!(email = %email, "OTP generated");

    mailer
        .send_password_reset_otp(&email, &admin.name, &otp, false)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "OTP sent to your email",
    })))
}

/// Checks a submitted OTP and, when valid, issues the 15-minute reset token.
/// The stored code is kept until the reset completes.
#[post("/api/admin/auth/verify-otp")]
async fn verify_otp(
    keys: web::Data<JwtKeys>,
    otp_store: web::Data<dyn OtpStore>,
    data: web::Json<VerifyOtpRequest>,
) -> AppResult<impl Responder> {
    let (Some(email), Some(otp)) = (&data.email, &data.otp) else {
        return Err(AppError::Validation("Email and OTP are required".to_string()));
    };
    let email = normalize_email(email);

    match check_otp(otp_store.get_ref(), &email, otp, Utc::now()).await {
        OtpCheck::NotFound => Err(AppError::Validation(
            "OTP not found or expired. Please request a new one.".to_string(),
        )),
        OtpCheck::Expired => Err(AppError::Validation(
            "OTP has expired. Please request a new one.".to_string(),
        )),
        OtpCheck::Mismatch => Err(AppError::Validation(
            "Invalid OTP. Please check and try again.".to_string(),
        )),
        OtpCheck::Valid => {
            let reset_token = auth::sign_reset_token(&keys, &email)?;
            tracing::info!(email = %email, "OTP verified");

            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "OTP verified successfully",
                "resetToken": reset_token,
            })))
        }
    }
}

/// Completes the flow: verifies the reset token, stores the new password
/// hash and clears the OTP record.
#[post("/api/admin/auth/reset-password")]
async fn reset_password(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    otp_store: web::Data<dyn OtpStore>,
    data: web::Json<ResetPasswordRequest>,
) -> AppResult<impl Responder> {
    let (Some(reset_token), Some(new_password)) = (&data.reset_token, &data.new_password) else {
        return Err(AppError::Validation(
            "Reset token and new password are required".to_string(),
        ));
    };

    let claims = auth::verify_reset_token(&keys, reset_token)?;
    let email = normalize_email(&claims.email);

    let admin = find_admin_by_email(&repo, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    let hash = auth::hash_password(new_password)?;
    repo.admins()
        .update_one(
            doc! { "_id": admin.id.unwrap() },
            doc! { "$set": { "password": hash, "updatedAt": DateTime::now() } },
        )
        .await
        .map_err(|e| AppError::database("reset_password", e))?;

    otp_store.remove(&email).await;

    tracing::info!(email = %email, "Password reset successful");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password reset successfully. You can now login with your new password.",
    })))
}

/// Re-issues the OTP, overwriting the previous code.
#[post("/api/admin/auth/resend-otp")]
async fn resend_otp(
    repo: web::Data<MongoRepo>,
    otp_store: web::Data<dyn OtpStore>,
    mailer: web::Data<Mailer>,
    data: web::Json<ForgotPasswordRequest>,
) -> AppResult<impl Responder> {
    let Some(email) = &data.email else {
        return Err(AppError::Validation("Email is required".to_string()));
    };
    let email = normalize_email(email);

    let Some(admin) = find_admin_by_email(&repo, &email).await? else {
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "If the email exists, an OTP has been sent",
        })));
    };

    if !admin.is_active {
        return Err(AppError::Forbidden(
            "Admin account is deactivated".to_string(),
        ));
    }

    let otp = generate_otp();
    otp_store
        .put(&email, StoredOtp::issued_at(otp.clone(), Utc::now()))
        .await;

    tracing::info!(email = %email, "OTP resent");

    mailer
        .send_password_reset_otp(&email, &admin.name, &otp, true)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "OTP resent successfully",
    })))
}

/// Confirms the bearer token still maps to an active admin.
#[get("/api/admin/auth/verify")]
async fn verify_session(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let admin = authenticate_admin(&repo, &keys, &req).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "authenticated": true,
        "admin": admin_summary(&admin),
    })))
}

#[get("/api/admin/auth/profile")]
async fn admin_profile(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let admin = authenticate_admin(&repo, &keys, &req).await?;

    let last_login = admin
        .last_login
        .and_then(|at| at.try_to_rfc3339_string().ok());

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "admin": {
            "id": admin.id.unwrap().to_hex(),
            "name": admin.name,
            "email": admin.email,
            "role": admin.role,
            "lastLogin": last_login,
        },
    })))
}

/// Changes the password of the logged-in admin after re-checking the
/// current one.
#[post("/api/admin/auth/change-password")]
async fn change_password(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    data: web::Json<ChangePasswordRequest>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let (Some(current_password), Some(new_password)) =
        (&data.current_password, &data.new_password)
    else {
        return Err(AppError::Validation(
            "Please provide current and new password".to_string(),
        ));
    };

    let admin = authenticate_admin(&repo, &keys, &req).await?;

    if !admin.verify_password(current_password)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    let hash = auth::hash_password(new_password)?;
    repo.admins()
        .update_one(
            doc! { "_id": admin.id.unwrap() },
            doc! { "$set": { "password": hash, "updatedAt": DateTime::now() } },
        )
        .await
        .map_err(|e| AppError::database("change_password", e))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}

/// Stateless-token design: logout is an acknowledgment, the client drops
/// the token.
#[post("/api/admin/auth/logout")]
async fn admin_logout(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate_admin(&repo, &keys, &req).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(admin_login);
    cfg.service(forgot_password);
    cfg.service(verify_otp);
    cfg.service(reset_password);
    cfg.service(resend_otp);
    cfg.service(verify_session);
    cfg.service(admin_profile);
    cfg.service(change_password);
    cfg.service(admin_logout);
}
