//! Booking input validation rules.
//!
//! Pure functions over the booking-creation payload: no storage access, no
//! side effects beyond logging. Each rule either accepts or fails with a
//! human-readable message that the handler relays verbatim in the response
//! envelope.
//!
//! Capacity and room-count ceilings live on [`RoomType`]; the generic
//! 20-guest / 6-room bounds below cap any request before the per-type rules
//! run.

use chrono::{DateTime, NaiveDate, Utc};

use crate::api::{AppError, AppResult};
use crate::db::models::RoomType;

/// Absolute ceiling on guests for any request.
pub const MAX_GUESTS: i32 = 20;
/// Absolute ceiling on rooms for any request.
pub const MAX_ROOMS: i32 = 6;
/// Word limit for the optional special-requests note.
pub const MAX_SPECIAL_REQUEST_WORDS: usize = 30;

/// Canonical form of an email address for lookups and OTP keys.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks presence of every required field, reporting all missing ones at
/// once rather than the first.
pub fn required_fields(fields: &[(&str, bool)]) -> AppResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Letters, spaces, hyphens and apostrophes; length 2..=100.
pub fn guest_name(name: &str) -> AppResult<()> {
    let valid_chars = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '-' || c == '\'');

    if !valid_chars {
        return Err(AppError::Validation(
            "Guest name can only contain letters, spaces, hyphens and apostrophes".to_string(),
        ));
    }

    let len = name.chars().count();
    if len < 2 {
        return Err(AppError::Validation(
            "Guest name must be at least 2 characters".to_string(),
        ));
    }
    if len > 100 {
        return Err(AppError::Validation(
            "Guest name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Exactly 10 digits after stripping separators, first digit 6-9 (regional
/// mobile format).
pub fn phone(phone: &str) -> AppResult<()> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 10 {
        return Err(AppError::Validation(
            "Phone number must be exactly 10 digits".to_string(),
        ));
    }

    if !matches!(digits.as_bytes()[0], b'6'..=b'9') {
        return Err(AppError::Validation(
            "Please enter a valid 10-digit phone number starting with 6-9".to_string(),
        ));
    }

    Ok(())
}

/// Basic shape check only; deliverability is the mail collaborator's problem.
pub fn email(email: &str) -> AppResult<()> {
    if email.contains('@') && email.contains('.') {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ))
    }
}

/// Children never negative, never all of the party (at least one adult).
pub fn children(children: i32, total_guests: i32) -> AppResult<()> {
    if children < 0 {
        return Err(AppError::Validation(
            "Number of children cannot be negative".to_string(),
        ));
    }
    if children > total_guests {
        return Err(AppError::Validation(
            "Number of children cannot exceed total guests".to_string(),
        ));
    }
    if children == total_guests && total_guests > 0 {
        return Err(AppError::Validation(
            "At least 1 adult is required (children cannot book alone)".to_string(),
        ));
    }
    Ok(())
}

/// Optional note, at most 30 whitespace-delimited words.
pub fn special_requests(text: Option<&str>) -> AppResult<()> {
    let Some(text) = text else { return Ok(()) };
    if text.trim().is_empty() {
        return Ok(());
    }

    let word_count = text.split_whitespace().count();
    if word_count > MAX_SPECIAL_REQUEST_WORDS {
        return Err(AppError::Validation(format!(
            "Special requests must be {} words or less (currently {} words)",
            MAX_SPECIAL_REQUEST_WORDS, word_count
        )));
    }

    Ok(())
}

/// Generic guest bounds, independent of room type.
pub fn guest_count(guests: i32) -> AppResult<()> {
    if guests < 1 {
        return Err(AppError::Validation(
            "At least 1 guest is required".to_string(),
        ));
    }
    if guests > MAX_GUESTS {
        return Err(AppError::Validation(format!(
            "Maximum {} guests allowed",
            MAX_GUESTS
        )));
    }
    Ok(())
}

/// Generic room-count bounds, independent of room type.
pub fn room_count(number_of_rooms: i32) -> AppResult<()> {
    if number_of_rooms < 1 {
        return Err(AppError::Validation(
            "At least 1 room is required".to_string(),
        ));
    }
    if number_of_rooms > MAX_ROOMS {
        return Err(AppError::Validation(format!(
            "Maximum {} rooms allowed",
            MAX_ROOMS
        )));
    }
    Ok(())
}

/// Total party size against the type's overall capacity.
pub fn guest_capacity_by_room_type(guests: i32, room_type: RoomType) -> AppResult<()> {
    let max = room_type.max_guests();
    if guests > max {
        return Err(AppError::Validation(format!(
            "{} can accommodate maximum {} guests",
            room_type, max
        )));
    }
    Ok(())
}

/// Requested room count against the type's physical inventory.
pub fn room_count_by_type(number_of_rooms: i32, room_type: RoomType) -> AppResult<()> {
    let max = room_type.max_rooms();
    if number_of_rooms > max {
        return Err(AppError::Validation(format!(
            "Maximum {} {} room{} available",
            max,
            room_type,
            if max > 1 { "s" } else { "" }
        )));
    }
    Ok(())
}

/// Party must fit in the requested rooms at 3 guests per room; on failure
/// recommends the exact room count, or reports the type as outgrown when the
/// recommendation exceeds its inventory.
pub fn guests_match_rooms(guests: i32, number_of_rooms: i32, room_type: RoomType) -> AppResult<()> {
    let capacity_per_room = RoomType::CAPACITY_PER_ROOM;
    let total_capacity = capacity_per_room * number_of_rooms;

    if guests > total_capacity {
        let recommended_rooms = (guests as u32).div_ceil(capacity_per_room as u32) as i32;
        let max_rooms = room_type.max_rooms();

        if recommended_rooms > max_rooms {
            return Err(AppError::Validation(format!(
                "{} guests exceed capacity. {} can accommodate maximum {} guests with {} rooms (3 guests per room)",
                guests, room_type, total_capacity, max_rooms
            )));
        }

        return Err(AppError::Validation(format!(
            "{} guests require at least {} rooms (3 guests per room)",
            guests, recommended_rooms
        )));
    }

    Ok(())
}

/// Parses a calendar day (`YYYY-MM-DD`) into a UTC-midnight instant.
pub fn parse_day(value: &str, field: &str) -> AppResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{} must be a valid date (YYYY-MM-DD)", field)))?;
    Ok(date.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc())
}

/// Parses and orders the stay dates: checkout strictly after check-in,
/// check-in not before `today`.
pub fn dates(
    check_in: &str,
    check_out: &str,
    today: NaiveDate,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let check_in = parse_day(check_in, "Check-in")?;
    let check_out = parse_day(check_out, "Check-out")?;

    if check_out <= check_in {
        return Err(AppError::Validation(
            "Check-out date must be after check-in date".to_string(),
        ));
    }

    let today_midnight = today.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc();
    if check_in < today_midnight {
        return Err(AppError::Validation(
            "Check-in date cannot be in the past".to_string(),
        ));
    }

    Ok((check_in, check_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: AppResult<()>) -> String {
        match result {
            Err(AppError::Validation(message)) => message,
            other => panic!("expected validation error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn required_fields_lists_every_missing_field() {
        let result = required_fields(&[
            ("room", true),
            ("checkIn", false),
            ("guests", false),
            ("guestEmail", true),
        ]);
        assert_eq!(message(result), "Missing required fields: checkIn, guests");

        assert!(required_fields(&[("room", true)]).is_ok());
    }

    #[test]
    fn guest_name_accepts_letters_spaces_hyphens_apostrophes() {
        assert!(guest_name("Priya O'Neil-Sharma").is_ok());
        assert!(guest_name("Jo").is_ok());
        assert!(guest_name("J").is_err());
        assert!(guest_name("R2D2").is_err());
        assert!(guest_name("").is_err());
        assert!(guest_name(&"a".repeat(101)).is_err());
        assert!(guest_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn phone_strips_separators_and_checks_leading_digit() {
        assert!(phone("9876543210").is_ok());
        assert!(phone("98765-43210").is_ok());
        assert!(phone("5876543210").is_err());
        assert!(phone("987654321").is_err());
        assert!(phone("98765432100").is_err());
    }

    #[test]
    fn children_rules() {
        assert!(children(0, 4).is_ok());
        assert!(children(3, 4).is_ok());
        assert!(children(-1, 4).is_err());
        assert!(children(5, 4).is_err());
        // no all-child booking
        assert!(children(4, 4).is_err());
        // zero guests, zero children passes through this rule
        assert!(children(0, 0).is_ok());
    }

    #[test]
    fn special_requests_word_limit() {
        assert!(special_requests(None).is_ok());
        assert!(special_requests(Some("   ")).is_ok());
        let thirty = vec!["word"; 30].join(" ");
        assert!(special_requests(Some(&thirty)).is_ok());
        let thirty_one = vec!["word"; 31].join(" ");
        let msg = message(special_requests(Some(&thirty_one)));
        assert!(msg.contains("currently 31 words"));
    }

    #[test]
    fn capacity_boundaries_per_room_type() {
        for (room_type, max) in [
            (RoomType::FamilySuite, 9),
            (RoomType::DeluxeMountainView, 6),
            (RoomType::CozyMountainCabin, 3),
        ] {
            assert!(guest_capacity_by_room_type(max, room_type).is_ok());
            assert!(guest_capacity_by_room_type(max + 1, room_type).is_err());
        }
    }

    #[test]
    fn room_count_boundaries_per_room_type() {
        for (room_type, max) in [
            (RoomType::FamilySuite, 3),
            (RoomType::DeluxeMountainView, 2),
            (RoomType::CozyMountainCabin, 1),
        ] {
            assert!(room_count_by_type(max, room_type).is_ok());
            assert!(room_count_by_type(max + 1, room_type).is_err());
        }
        assert_eq!(
            message(room_count_by_type(2, RoomType::CozyMountainCabin)),
            "Maximum 1 Cozy Mountain Cabin room available"
        );
    }

    #[test]
    fn six_guests_fit_two_deluxe_rooms_but_not_one() {
        assert!(guests_match_rooms(6, 2, RoomType::DeluxeMountainView).is_ok());

        let msg = message(guests_match_rooms(6, 1, RoomType::DeluxeMountainView));
        assert_eq!(msg, "6 guests require at least 2 rooms (3 guests per room)");
    }

    #[test]
    fn party_outgrowing_the_type_reports_capacity_exceeded() {
        let msg = message(guests_match_rooms(8, 2, RoomType::DeluxeMountainView));
        assert!(msg.contains("exceed capacity"));

        // recommendation within inventory asks for more rooms instead
        let msg = message(guests_match_rooms(7, 1, RoomType::FamilySuite));
        assert_eq!(msg, "7 guests require at least 3 rooms (3 guests per room)");
    }

    #[test]
    fn generic_bounds() {
        assert!(guest_count(1).is_ok());
        assert!(guest_count(20).is_ok());
        assert!(guest_count(0).is_err());
        assert!(guest_count(21).is_err());
        assert!(room_count(1).is_ok());
        assert!(room_count(6).is_ok());
        assert!(room_count(0).is_err());
        assert!(room_count(7).is_err());
    }

    #[test]
    fn dates_require_strict_ordering_and_no_past_check_in() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let (check_in, check_out) = dates("2025-06-10", "2025-06-12", today).unwrap();
        assert_eq!((check_out - check_in).num_days(), 2);

        assert!(dates("2025-06-10", "2025-06-10", today).is_err());
        assert!(dates("2025-06-12", "2025-06-10", today).is_err());
        assert!(dates("2025-05-31", "2025-06-02", today).is_err());
        // today itself is bookable
        assert!(dates("2025-06-01", "2025-06-02", today).is_ok());
        assert!(dates("junk", "2025-06-10", today).is_err());
    }
}
