//! Session tokens, password-reset tokens and password hashing.
//!
//! Tokens are HS256 JWTs signed with the key pair derived from `JWT_SECRET`.
//! Session tokens live 7 days and carry the account id, email and role;
//! reset tokens live 15 minutes and are scoped by a fixed purpose claim so a
//! session token can never be replayed as a reset authorization.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::{AppError, AppResult};

pub const SESSION_TOKEN_DAYS: i64 = 7;
pub const RESET_TOKEN_MINUTES: i64 = 15;
pub const RESET_PURPOSE: &str = "password-reset";

/// Minimum length for any new password set through the API.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const BCRYPT_COST: u32 = 12;

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (hex ObjectId).
    pub sub: String,
    pub email: String,
    /// "admin", "host" or "user".
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims embedded in password-reset tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub email: String,
    pub purpose: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues a 7-day session token for an authenticated account.
pub fn sign_session_token(
    keys: &JwtKeys,
    account_id: &str,
    email: &str,
    role: &str,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(SESSION_TOKEN_DAYS)).timestamp(),
    };
    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| AppError::internal_trace(&format!("signing session token: {}", e)))
}

/// Verifies a session token's signature and expiry.
///
/// Returns the raw jsonwebtoken error so the caller can distinguish an
/// expired token from a tampered one.
pub fn verify_session_token(
    keys: &JwtKeys,
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(token, &keys.decoding, &Validation::default()).map(|data| data.claims)
}

/// Issues a 15-minute purpose-scoped reset token after OTP verification.
pub fn sign_reset_token(keys: &JwtKeys, email: &str) -> AppResult<String> {
    let now = Utc::now();
    let claims = ResetClaims {
        email: email.to_string(),
        purpose: RESET_PURPOSE.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(RESET_TOKEN_MINUTES)).timestamp(),
    };
    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| AppError::internal_trace(&format!("signing reset token: {}", e)))
}

/// Verifies a reset token: signature, expiry and the purpose claim.
pub fn verify_reset_token(keys: &JwtKeys, token: &str) -> AppResult<ResetClaims> {
    let claims = decode::<ResetClaims>(token, &keys.decoding, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| {
            AppError::Validation(
                "Invalid or expired reset token. Please start the process again.".to_string(),
            )
        })?;

    if claims.purpose != RESET_PURPOSE {
        return Err(AppError::Validation("Invalid reset token".to_string()));
    }

    Ok(claims)
}

pub fn hash_password(plain: &str) -> AppResult<String> {
    bcrypt::hash(plain, BCRYPT_COST)
        .map_err(|e| AppError::internal_trace(&format!("hashing password: {}", e)))
}

pub fn verify_password(candidate: &str, hash: &str) -> AppResult<bool> {
    bcrypt::verify(candidate, hash)
        .map_err(|e| AppError::internal_trace(&format!("verifying password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::from_secret("test-secret")
    }

    #[test]
    fn session_token_round_trips_claims() {
        let keys = keys();
        let token =
            sign_session_token(&keys, "64f000000000000000000001", "owner@aamantran.in", "admin")
                .unwrap();
        let claims = verify_session_token(&keys, &token).unwrap();
        assert_eq!(claims.sub, "64f000000000000000000001");
        assert_eq!(claims.email, "owner@aamantran.in");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let keys = keys();
        let token = sign_session_token(&keys, "id", "a@b.c", "admin").unwrap();
        let other = JwtKeys::from_secret("another-secret");
        assert!(verify_session_token(&other, &token).is_err());
    }

    #[test]
    fn reset_token_requires_reset_purpose() {
        let keys = keys();

        let good = sign_reset_token(&keys, "owner@aamantran.in").unwrap();
        let claims = verify_reset_token(&keys, &good).unwrap();
        assert_eq!(claims.email, "owner@aamantran.in");
        assert_eq!(claims.purpose, RESET_PURPOSE);

        // a session token is not a reset authorization
        let session = sign_session_token(&keys, "id", "owner@aamantran.in", "admin").unwrap();
        assert!(verify_reset_token(&keys, &session).is_err());
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        let keys = keys();
        let now = Utc::now();
        let stale = ResetClaims {
            email: "owner@aamantran.in".to_string(),
            purpose: RESET_PURPOSE.to_string(),
            iat: (now - Duration::minutes(30)).timestamp(),
            exp: (now - Duration::minutes(15)).timestamp(),
        };
        let token = encode(&Header::default(), &stale, &keys.encoding).unwrap();
        assert!(verify_reset_token(&keys, &token).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }
}
