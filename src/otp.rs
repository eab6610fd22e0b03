//! One-time codes for the password-reset flow.
//!
//! Codes are 6-digit numerics with a 10-minute absolute expiry, keyed by
//! email with at most one live code per address (a new issuance overwrites).
//! The store is an injected abstraction so the default in-process map can be
//! swapped for a shared backing store when running more than one instance.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Lifetime of an issued code.
pub const OTP_TTL_MINUTES: i64 = 10;

/// A stored code with its absolute expiry.
#[derive(Debug, Clone)]
pub struct StoredOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredOtp {
    /// Wraps a freshly generated code with the standard TTL.
    pub fn issued_at(code: String, now: DateTime<Utc>) -> Self {
        StoredOtp {
            code,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Key-value store for live OTPs, keyed by email.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Stores a code, replacing any live code for the same email.
    async fn put(&self, email: &str, otp: StoredOtp);
    async fn get(&self, email: &str) -> Option<StoredOtp>;
    async fn remove(&self, email: &str);
}

/// Process-local store. Suitable for a single instance; a multi-instance
/// deployment needs a shared implementation behind the same trait.
#[derive(Default)]
pub struct InMemoryOtpStore {
    codes: RwLock<HashMap<String, StoredOtp>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, email: &str, otp: StoredOtp) {
        self.codes.write().await.insert(email.to_string(), otp);
    }

    async fn get(&self, email: &str) -> Option<StoredOtp> {
        self.codes.read().await.get(email).cloned()
    }

    async fn remove(&self, email: &str) {
        self.codes.write().await.remove(email);
    }
}

/// 6-digit code, uniform over [100000, 999999].
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Outcome of checking a submitted code against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// No live code for this email.
    NotFound,
    /// The stored code's TTL elapsed; it has been purged.
    Expired,
    /// A live code exists but does not match.
    Mismatch,
    Valid,
}

/// Runs the verification ladder: missing, expired (purging the stale code),
/// mismatched, or valid. A valid check does NOT consume the code; it is
/// cleared only once the password reset completes.
pub async fn check_otp(
    store: &dyn OtpStore,
    email: &str,
    submitted: &str,
    now: DateTime<Utc>,
) -> OtpCheck {
    let Some(stored) = store.get(email).await else {
        return OtpCheck::NotFound;
    };

    if stored.is_expired(now) {
        store.remove(email).await;
        return OtpCheck::Expired;
    }

    if stored.code != submitted {
        return OtpCheck::Mismatch;
    }

    OtpCheck::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn code_valid_only_within_ttl_and_on_exact_match() {
        tokio_test::block_on(async {
            let store = InMemoryOtpStore::new();
            store
                .put("owner@aamantran.in", StoredOtp::issued_at("123456".into(), now()))
                .await;

            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "123456", now()).await,
                OtpCheck::Valid
            );
            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "654321", now()).await,
                OtpCheck::Mismatch
            );
            // still inside the window
            let late = now() + Duration::minutes(OTP_TTL_MINUTES);
            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "123456", late).await,
                OtpCheck::Valid
            );
        });
    }

    #[test]
    fn expired_code_is_purged_and_stays_gone() {
        tokio_test::block_on(async {
            let store = InMemoryOtpStore::new();
            store
                .put("owner@aamantran.in", StoredOtp::issued_at("123456".into(), now()))
                .await;

            let after_expiry = now() + Duration::minutes(OTP_TTL_MINUTES) + Duration::seconds(1);
            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "123456", after_expiry).await,
                OtpCheck::Expired
            );
            // the same code a second time: the record is gone
            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "123456", after_expiry).await,
                OtpCheck::NotFound
            );
        });
    }

    #[test]
    fn new_issuance_overwrites_the_previous_code() {
        tokio_test::block_on(async {
            let store = InMemoryOtpStore::new();
            store
                .put("owner@aamantran.in", StoredOtp::issued_at("111111".into(), now()))
                .await;
            store
                .put("owner@aamantran.in", StoredOtp::issued_at("222222".into(), now()))
                .await;

            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "111111", now()).await,
                OtpCheck::Mismatch
            );
            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "222222", now()).await,
                OtpCheck::Valid
            );
        });
    }

    #[test]
    fn valid_check_does_not_consume_the_code() {
        tokio_test::block_on(async {
            let store = InMemoryOtpStore::new();
            store
                .put("owner@aamantran.in", StoredOtp::issued_at("123456".into(), now()))
                .await;

            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "123456", now()).await,
                OtpCheck::Valid
            );
            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "123456", now()).await,
                OtpCheck::Valid
            );
            store.remove("owner@aamantran.in").await;
            assert_eq!(
                check_otp(&store, "owner@aamantran.in", "123456", now()).await,
                OtpCheck::NotFound
            );
        });
    }

    #[test]
    fn codes_are_isolated_per_email() {
        tokio_test::block_on(async {
            let store = InMemoryOtpStore::new();
            store
                .put("a@aamantran.in", StoredOtp::issued_at("111111".into(), now()))
                .await;

            assert_eq!(
                check_otp(&store, "b@aamantran.in", "111111", now()).await,
                OtpCheck::NotFound
            );
        });
    }
}
