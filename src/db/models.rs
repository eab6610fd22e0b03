//! Document models for the booking database.
//!
//! Field names mirror the stored documents (camelCase). Room type, booking
//! status and payment status are closed enums; an unknown value is rejected
//! at deserialization instead of falling through a string lookup.
//!
//! Passwords are hashed in the constructors (`Admin::new`, `User::new`) so a
//! value never exists holding a plaintext password.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::AppResult;
use crate::auth;

/// Failed logins tolerated before an account is locked.
pub const MAX_LOGIN_ATTEMPTS: i32 = 5;
/// Lock duration once the attempt limit is reached.
pub const LOCK_DURATION_HOURS: i64 = 2;
/// Cancellations must leave at least this margin before check-in.
pub const CANCELLATION_WINDOW_HOURS: i64 = 24;

/// Room categories offered by the homestay.
///
/// The capacity tables hang off this enum: every room holds 3 guests, the
/// type decides how many physical rooms exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "Family Suite")]
    FamilySuite,
    #[serde(rename = "Deluxe Mountain View")]
    DeluxeMountainView,
    #[serde(rename = "Cozy Mountain Cabin")]
    CozyMountainCabin,
}

impl RoomType {
    /// Guests a single physical room of any type holds.
    pub const CAPACITY_PER_ROOM: i32 = 3;

    /// Maximum guests across all rooms of this type.
    pub fn max_guests(self) -> i32 {
        Self::CAPACITY_PER_ROOM * self.max_rooms()
    }

    /// Physical rooms available for this type.
    pub fn max_rooms(self) -> i32 {
        match self {
            RoomType::FamilySuite => 3,
            RoomType::DeluxeMountainView => 2,
            RoomType::CozyMountainCabin => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoomType::FamilySuite => "Family Suite",
            RoomType::DeluxeMountainView => "Deluxe Mountain View",
            RoomType::CozyMountainCabin => "Cozy Mountain Cabin",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking lifecycle state. `cancelled` and `completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Active bookings block the room for their date range.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Host,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Host => "host",
            UserRole::Admin => "admin",
        }
    }
}

/// A bookable room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nightly price per room.
    pub price: f64,
    /// Guest capacity as advertised on the room itself. Tracked
    /// independently of the type-implied capacity tables.
    pub capacity: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub is_available: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A reservation for a room over a half-open `[checkIn, checkOut)` range.
///
/// Both dates are stored at UTC midnight; the checkout day is free for a new
/// check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ObjectId>,
    pub check_in: DateTime,
    pub check_out: DateTime,
    pub guests: i32,
    #[serde(default)]
    pub children: i32,
    pub number_of_rooms: i32,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub nights: i32,
    pub price_per_night: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total_price: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Booking {
    /// A booking can be cancelled while more than 24 hours remain before
    /// check-in and it has not already reached a terminal state.
    pub fn can_be_cancelled(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        if !self.status.is_active() {
            return false;
        }
        self.check_in.to_chrono() - now > chrono::Duration::hours(CANCELLATION_WINDOW_HOURS)
    }

    /// Nights covered by `[check_in, check_out)`, rounding partial days up.
    pub fn nights_between(
        check_in: chrono::DateTime<chrono::Utc>,
        check_out: chrono::DateTime<chrono::Utc>,
    ) -> i32 {
        let seconds = (check_out - check_in).num_seconds();
        (seconds as u64).div_ceil(86_400) as i32
    }
}

/// Administrator credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// bcrypt hash, never the plaintext.
    pub password: String,
    pub role: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Admin {
    /// Builds a new administrator, normalizing the email and hashing the
    /// password before the value exists.
    pub fn new(name: &str, email: &str, password: &str) -> AppResult<Admin> {
        let now = DateTime::now();
        Ok(Admin {
            id: None,
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password: auth::hash_password(password)?,
            role: "admin".to_string(),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, candidate: &str) -> AppResult<bool> {
        auth::verify_password(candidate, &self.password)
    }
}

/// End-user account. Owns bookings and carries the login-lockout counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
    #[serde(default)]
    pub login_attempts: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_until: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    pub fn new(name: &str, email: &str, password: &str, phone: Option<String>) -> AppResult<User> {
        let now = DateTime::now();
        Ok(User {
            id: None,
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password: auth::hash_password(password)?,
            phone,
            role: UserRole::User,
            is_verified: false,
            is_active: true,
            last_login: None,
            login_attempts: 0,
            lock_until: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, candidate: &str) -> AppResult<bool> {
        auth::verify_password(candidate, &self.password)
    }

    pub fn is_locked(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.lock_until
            .map(|until| until.to_chrono() > now)
            .unwrap_or(false)
    }

    /// Records a failed login attempt.
    ///
    /// A lock that has already expired restarts the counter at 1 (the attempt
    /// discovering the expiry is itself a failure). Reaching
    /// [`MAX_LOGIN_ATTEMPTS`] locks the account for [`LOCK_DURATION_HOURS`].
    pub fn register_failed_attempt(&mut self, now: chrono::DateTime<chrono::Utc>) {
        match self.lock_until {
            Some(until) if until.to_chrono() <= now => {
                self.login_attempts = 1;
                self.lock_until = None;
            }
            _ => {
                self.login_attempts += 1;
                if self.login_attempts >= MAX_LOGIN_ATTEMPTS && !self.is_locked(now) {
                    let until = now + chrono::Duration::hours(LOCK_DURATION_HOURS);
                    self.lock_until = Some(DateTime::from_chrono(until));
                }
            }
        }
    }

    /// Clears the attempt counter and any lock after a successful login.
    pub fn reset_login_attempts(&mut self) {
        self.login_attempts = 0;
        self.lock_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_booking(status: BookingStatus, check_in: chrono::DateTime<Utc>) -> Booking {
        Booking {
            id: None,
            room: ObjectId::new(),
            user: None,
            check_in: DateTime::from_chrono(check_in),
            check_out: DateTime::from_chrono(check_in + Duration::days(2)),
            guests: 2,
            children: 0,
            number_of_rooms: 1,
            guest_name: "Asha Rawat".to_string(),
            guest_email: "asha@example.com".to_string(),
            guest_phone: "9876543210".to_string(),
            special_requests: None,
            nights: 2,
            price_per_night: 2500.0,
            tax_amount: 0.0,
            discount_amount: 0.0,
            total_price: 5000.0,
            status,
            payment_status: PaymentStatus::Pending,
            cancellation_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    fn sample_user() -> User {
        User {
            id: None,
            name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
            password: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            phone: None,
            role: UserRole::User,
            is_verified: false,
            is_active: true,
            last_login: None,
            login_attempts: 0,
            lock_until: None,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn capacity_tables_per_type() {
        assert_eq!(RoomType::FamilySuite.max_guests(), 9);
        assert_eq!(RoomType::DeluxeMountainView.max_guests(), 6);
        assert_eq!(RoomType::CozyMountainCabin.max_guests(), 3);
        assert_eq!(RoomType::FamilySuite.max_rooms(), 3);
        assert_eq!(RoomType::DeluxeMountainView.max_rooms(), 2);
        assert_eq!(RoomType::CozyMountainCabin.max_rooms(), 1);
    }

    #[test]
    fn room_type_round_trips_display_names() {
        let json = serde_json::to_string(&RoomType::DeluxeMountainView).unwrap();
        assert_eq!(json, "\"Deluxe Mountain View\"");
        let back: RoomType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RoomType::DeluxeMountainView);
        assert!(serde_json::from_str::<RoomType>("\"Penthouse\"").is_err());
    }

    #[test]
    fn cancellation_requires_24_hour_margin() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        let far = sample_booking(BookingStatus::Confirmed, now + Duration::hours(25));
        assert!(far.can_be_cancelled(now));

        let near = sample_booking(BookingStatus::Confirmed, now + Duration::hours(23));
        assert!(!near.can_be_cancelled(now));

        // exactly 24h out is too late
        let edge = sample_booking(BookingStatus::Pending, now + Duration::hours(24));
        assert!(!edge.can_be_cancelled(now));
    }

    #[test]
    fn terminal_states_cannot_be_cancelled() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let check_in = now + Duration::days(10);
        assert!(!sample_booking(BookingStatus::Cancelled, check_in).can_be_cancelled(now));
        assert!(!sample_booking(BookingStatus::Completed, check_in).can_be_cancelled(now));
        assert!(sample_booking(BookingStatus::Pending, check_in).can_be_cancelled(now));
    }

    #[test]
    fn nights_round_partial_days_up() {
        let check_in = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap();
        assert_eq!(Booking::nights_between(check_in, check_out), 2);

        let late_out = Utc.with_ymd_and_hms(2025, 6, 12, 6, 0, 0).unwrap();
        assert_eq!(Booking::nights_between(check_in, late_out), 3);
    }

    #[test]
    fn fifth_failed_attempt_locks_for_two_hours() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut user = sample_user();

        for _ in 0..4 {
            user.register_failed_attempt(now);
            assert!(!user.is_locked(now));
        }
        user.register_failed_attempt(now);
        assert_eq!(user.login_attempts, MAX_LOGIN_ATTEMPTS);
        assert!(user.is_locked(now));
        assert!(user.is_locked(now + Duration::minutes(119)));
        assert!(!user.is_locked(now + Duration::hours(2) + Duration::seconds(1)));
    }

    #[test]
    fn expired_lock_restarts_counter_at_one() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut user = sample_user();
        for _ in 0..5 {
            user.register_failed_attempt(now);
        }

        let after_lock = now + Duration::hours(3);
        user.register_failed_attempt(after_lock);
        assert_eq!(user.login_attempts, 1);
        assert!(!user.is_locked(after_lock));
    }

    #[test]
    fn successful_login_resets_counter() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut user = sample_user();
        for _ in 0..5 {
            user.register_failed_attempt(now);
        }
        user.reset_login_attempts();
        assert_eq!(user.login_attempts, 0);
        assert!(!user.is_locked(now));
    }
}
