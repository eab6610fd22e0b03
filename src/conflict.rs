//! Booking conflict detection.
//!
//! Two stays on the same room conflict when their half-open
//! `[checkIn, checkOut)` ranges intersect; a check-in on another booking's
//! checkout day is a same-day turnover, not a conflict. Only active bookings
//! (pending, confirmed) block a room.
//!
//! The check is read-then-decide: it is not atomic with the insert that
//! follows it, so two concurrent writers can both pass (see DESIGN.md for
//! the hardening path).

use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};

use crate::api::{AppError, AppResult};
use crate::db::models::{Booking, BookingStatus};
use crate::db::MongoRepo;

/// Half-open interval overlap test.
pub fn ranges_overlap(
    a_start: chrono::DateTime<chrono::Utc>,
    a_end: chrono::DateTime<chrono::Utc>,
    b_start: chrono::DateTime<chrono::Utc>,
    b_end: chrono::DateTime<chrono::Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Builds the overlap query for a room and date range, optionally excluding
/// one booking id (re-validation on update).
pub fn overlap_filter(
    room_id: ObjectId,
    check_in: chrono::DateTime<chrono::Utc>,
    check_out: chrono::DateTime<chrono::Utc>,
    exclude_booking_id: Option<ObjectId>,
) -> Document {
    let mut filter = doc! {
        "room": room_id,
        "status": { "$in": [
            BookingStatus::Pending.as_str(),
            BookingStatus::Confirmed.as_str(),
        ] },
        "checkIn": { "$lt": DateTime::from_chrono(check_out) },
        "checkOut": { "$gt": DateTime::from_chrono(check_in) },
    };

    if let Some(id) = exclude_booking_id {
        filter.insert("_id", doc! { "$ne": id });
    }

    filter
}

/// Returns the first active booking overlapping the requested range, if any.
/// One conflicting booking suffices to reject a write.
pub async fn find_overlapping(
    repo: &MongoRepo,
    room_id: ObjectId,
    check_in: chrono::DateTime<chrono::Utc>,
    check_out: chrono::DateTime<chrono::Utc>,
    exclude_booking_id: Option<ObjectId>,
) -> AppResult<Option<Booking>> {
    let filter = overlap_filter(room_id, check_in, check_out, exclude_booking_id);

    let conflicting = repo
        .bookings()
        .find_one(filter)
        .await
        .map_err(|e| AppError::database("find_overlapping", e))?;

    match &conflicting {
        Some(booking) => {
            tracing::warn!(
                room = %room_id,
                existing_check_in = %booking.check_in,
                existing_check_out = %booking.check_out,
                requested_check_in = %check_in,
                requested_check_out = %check_out,
                "Conflicting booking found"
            );
        }
        None => {
            tracing::debug!(room = %room_id, "No booking conflicts found");
        }
    }

    Ok(conflicting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn overlapping_ranges_conflict() {
        // existing [1, 5), query [4, 6)
        assert!(ranges_overlap(day(4), day(6), day(1), day(5)));
        // fully contained
        assert!(ranges_overlap(day(2), day(3), day(1), day(5)));
        // containing
        assert!(ranges_overlap(day(1), day(9), day(3), day(4)));
        // single shared night
        assert!(ranges_overlap(day(4), day(5), day(4), day(8)));
    }

    #[test]
    fn back_to_back_stays_do_not_conflict() {
        // existing [1, 5), query [5, 8): checkout day is free for check-in
        assert!(!ranges_overlap(day(5), day(8), day(1), day(5)));
        // and the mirror image
        assert!(!ranges_overlap(day(1), day(5), day(5), day(8)));
        // disjoint
        assert!(!ranges_overlap(day(6), day(8), day(1), day(5)));
    }

    #[test]
    fn filter_targets_active_bookings_with_half_open_bounds() {
        let room = ObjectId::new();
        let filter = overlap_filter(room, day(10), day(12), None);

        assert_eq!(filter.get_object_id("room").unwrap(), room);

        let statuses = filter
            .get_document("status")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(statuses.len(), 2);

        // new range bounds the existing booking from both sides
        assert!(filter.get_document("checkIn").unwrap().contains_key("$lt"));
        assert!(filter.get_document("checkOut").unwrap().contains_key("$gt"));
        assert!(!filter.contains_key("_id"));
    }

    #[test]
    fn filter_excludes_the_booking_under_update() {
        let exclude = ObjectId::new();
        let filter = overlap_filter(ObjectId::new(), day(10), day(12), Some(exclude));
        assert_eq!(
            filter
                .get_document("_id")
                .unwrap()
                .get_object_id("$ne")
                .unwrap(),
            exclude
        );
    }
}
