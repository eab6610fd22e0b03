//! Booking API.
//!
//! The full reservation lifecycle:
//! - Create (public): validation rules, conflict check, persistence, then
//!   the notification email to the homestay inbox
//! - List with status filter and pagination (admin/host)
//! - Get, cancel (24-hour rule), my-bookings (authenticated)
//! - Update (admin/host), delete (admin)
//! - Availability check (public, pure read)
//!
//! A failed notification email after a successful insert surfaces as a 500
//! even though the booking exists; there is no partial-commit cleanup.

use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::middleware::{authenticate, extract_token, require_role, verify_bearer};
use super::{AppError, AppResult};
use crate::auth::JwtKeys;
use crate::conflict;
use crate::db::models::{Booking, BookingStatus, PaymentStatus, Room};
use crate::db::MongoRepo;
use crate::email::{BookingNotification, Mailer};
use crate::validation;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    room: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
    guests: Option<i32>,
    children: Option<i32>,
    number_of_rooms: Option<i32>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    special_requests: Option<String>,
    nights: Option<i32>,
    price_per_night: Option<f64>,
    total_price: Option<f64>,
    tax_amount: Option<f64>,
    discount_amount: Option<f64>,
}

/// Partial patch. Capacity and overlap rules are NOT re-run here; the
/// surface is admin/host only (see DESIGN.md).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBookingRequest {
    status: Option<BookingStatus>,
    payment_status: Option<PaymentStatus>,
    check_in: Option<String>,
    check_out: Option<String>,
    guests: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelBookingRequest {
    cancellation_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckAvailabilityRequest {
    room_id: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingListQuery {
    status: Option<String>,
    page: Option<u64>,
    limit: Option<i64>,
    sort_by: Option<String>,
}

/// Wire shape of a booking: hex ids, calendar-day dates.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingResponse {
    id: String,
    room: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    check_in: String,
    check_out: String,
    guests: i32,
    children: i32,
    number_of_rooms: i32,
    guest_name: String,
    guest_email: String,
    guest_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_requests: Option<String>,
    nights: i32,
    price_per_night: f64,
    tax_amount: f64,
    discount_amount: f64,
    total_price: f64,
    status: BookingStatus,
    payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancelled_at: Option<String>,
    created_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        BookingResponse {
            id: booking.id.unwrap().to_hex(),
            room: booking.room.to_hex(),
            user: booking.user.map(|id| id.to_hex()),
            check_in: booking.check_in.to_chrono().format("%Y-%m-%d").to_string(),
            check_out: booking.check_out.to_chrono().format("%Y-%m-%d").to_string(),
            guests: booking.guests,
            children: booking.children,
            number_of_rooms: booking.number_of_rooms,
            guest_name: booking.guest_name,
            guest_email: booking.guest_email,
            guest_phone: booking.guest_phone,
            special_requests: booking.special_requests,
            nights: booking.nights,
            price_per_night: booking.price_per_night,
            tax_amount: booking.tax_amount,
            discount_amount: booking.discount_amount,
            total_price: booking.total_price,
            status: booking.status,
            payment_status: booking.payment_status,
            cancellation_reason: booking.cancellation_reason,
            cancelled_at: booking
                .cancelled_at
                .and_then(|at| at.try_to_rfc3339_string().ok()),
            created_at: booking
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

/// Booking reference used in notification emails.
fn booking_reference(id: &ObjectId) -> String {
    let hex = id.to_hex();
    format!("BK-{}", hex[hex.len() - 6..].to_uppercase())
}

/// Resolves the account behind an optional bearer token. The create
/// endpoint is public; a logged-in guest gets the booking attached to their
/// account, everyone else books anonymously.
fn optional_account(keys: &JwtKeys, req: &HttpRequest) -> Option<ObjectId> {
    if extract_token(req).is_err() {
        return None;
    }
    verify_bearer(keys, req)
        .ok()
        .and_then(|claims| ObjectId::parse_str(&claims.sub).ok())
}

fn parse_booking_id(raw: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw)
        .map_err(|_| AppError::Validation("Invalid booking ID format".to_string()))
}

async fn find_booking(repo: &MongoRepo, id: ObjectId) -> AppResult<Booking> {
    repo.bookings()
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| AppError::database("find_booking", e))?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

/// Creates a booking.
///
/// Pipeline: required fields -> room exists and is available -> field rules
/// (name, email, phone, party composition, per-type capacity tables) ->
/// dates -> conflict check -> persist as pending/pending -> notify by email.
///
/// # Errors
/// - `400`: any violated validation rule, unavailable room, date conflict
/// - `404`: room does not exist
/// - `500`: database or email delivery failure
#[post("/api/bookings")]
async fn create_booking(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    mailer: web::Data<Mailer>,
    data: web::Json<CreateBookingRequest>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    validation::required_fields(&[
        ("room", data.room.is_some()),
        ("checkIn", data.check_in.is_some()),
        ("checkOut", data.check_out.is_some()),
        ("guests", data.guests.is_some()),
        ("numberOfRooms", data.number_of_rooms.is_some()),
        ("guestName", data.guest_name.is_some()),
        ("guestEmail", data.guest_email.is_some()),
        ("guestPhone", data.guest_phone.is_some()),
    ])?;

    // presence established above
    let room_raw = data.room.as_deref().unwrap();
    let check_in_raw = data.check_in.as_deref().unwrap();
    let check_out_raw = data.check_out.as_deref().unwrap();
    let guests = data.guests.unwrap();
    let number_of_rooms = data.number_of_rooms.unwrap();
    let guest_name = data.guest_name.as_deref().unwrap();
    let guest_email = data.guest_email.as_deref().unwrap();
    let guest_phone = data.guest_phone.as_deref().unwrap();
    let children = data.children.unwrap_or(0);

    let room_id = ObjectId::parse_str(room_raw)
        .map_err(|_| AppError::Validation("Invalid room ID format".to_string()))?;

    let room: Room = repo
        .rooms()
        .find_one(doc! { "_id": room_id })
        .await
        .map_err(|e| AppError::database("find_room", e))?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    if !room.is_available {
        return Err(AppError::Validation(
            "This room is currently unavailable".to_string(),
        ));
    }

    validation::guest_name(guest_name)?;
    validation::email(guest_email)?;
    validation::phone(guest_phone)?;
    validation::guest_count(guests)?;
    validation::children(children, guests)?;
    validation::special_requests(data.special_requests.as_deref())?;
    validation::guest_capacity_by_room_type(guests, room.room_type)?;
    validation::room_count(number_of_rooms)?;
    validation::room_count_by_type(number_of_rooms, room.room_type)?;
    validation::guests_match_rooms(guests, number_of_rooms, room.room_type)?;

    let (check_in, check_out) =
        validation::dates(check_in_raw, check_out_raw, Utc::now().date_naive())?;

    if conflict::find_overlapping(&repo, room_id, check_in, check_out, None)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Room is not available for selected dates".to_string(),
        ));
    }

    let nights = data
        .nights
        .unwrap_or_else(|| Booking::nights_between(check_in, check_out));
    let price_per_night = data.price_per_night.unwrap_or(room.price);
    let tax_amount = data.tax_amount.unwrap_or(0.0);
    let discount_amount = data.discount_amount.unwrap_or(0.0);
    let total_price = data.total_price.unwrap_or_else(|| {
        price_per_night * nights as f64 * number_of_rooms as f64 + tax_amount - discount_amount
    });

    let now = DateTime::now();
    let booking = Booking {
        id: None,
        room: room_id,
        user: optional_account(&keys, &req),
        check_in: DateTime::from_chrono(check_in),
        check_out: DateTime::from_chrono(check_out),
        guests,
        children,
        number_of_rooms,
        guest_name: guest_name.trim().to_string(),
        guest_email: guest_email.trim().to_lowercase(),
        guest_phone: guest_phone.to_string(),
        special_requests: data.special_requests.clone(),
        nights,
        price_per_night,
        tax_amount,
        discount_amount,
        total_price,
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
        cancellation_reason: None,
        cancelled_at: None,
        cancelled_by: None,
        created_at: now,
        updated_at: now,
    };

    let result = repo
        .bookings()
        .insert_one(&booking)
        .await
        .map_err(|e| AppError::database("create_booking", e))?;

    let booking_id = result.inserted_id.as_object_id().unwrap();
    tracing::info!(booking = %booking_id, room = %room_id, "Booking created");

    // Notification failure surfaces as an error although the booking is
    // already persisted; there is no rollback here.
    mailer
        .send_booking_notification(&BookingNotification {
            reference: booking_reference(&booking_id),
            guest_name: booking.guest_name.clone(),
            guest_email: booking.guest_email.clone(),
            guest_phone: booking.guest_phone.clone(),
            room_name: room.name.clone(),
            room_type: room.room_type.to_string(),
            check_in: check_in.format("%Y-%m-%d").to_string(),
            check_out: check_out.format("%Y-%m-%d").to_string(),
            nights,
            guests,
            number_of_rooms,
            total_price,
        })
        .await?;

    let mut created = booking;
    created.id = Some(booking_id);

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Booking created successfully",
        "data": { "booking": BookingResponse::from(created) },
    })))
}

/// Availability probe: runs the conflict detector without writing anything.
#[post("/api/bookings/check-availability")]
async fn check_availability(
    repo: web::Data<MongoRepo>,
    data: web::Json<CheckAvailabilityRequest>,
) -> AppResult<impl Responder> {
    let (Some(room_id), Some(check_in), Some(check_out)) =
        (&data.room_id, &data.check_in, &data.check_out)
    else {
        return Err(AppError::Validation(
            "Please provide roomId, checkIn, and checkOut dates".to_string(),
        ));
    };

    let room_id = ObjectId::parse_str(room_id)
        .map_err(|_| AppError::Validation("Invalid room ID format".to_string()))?;
    let check_in = validation::parse_day(check_in, "Check-in")?;
    let check_out = validation::parse_day(check_out, "Check-out")?;

    let overlapping =
        conflict::find_overlapping(&repo, room_id, check_in, check_out, None).await?;

    let available = overlapping.is_none();
    let message = if available {
        "Room is available"
    } else {
        "Room is not available for selected dates"
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "available": available, "message": message },
    })))
}

/// Bookings of the logged-in account, newest first.
#[get("/api/bookings/my-bookings")]
async fn my_bookings(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let claims = authenticate(&repo, &keys, &req).await?;
    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    let mut cursor = repo
        .bookings()
        .find(doc! { "user": user_id })
        .sort(doc! { "createdAt": -1 })
        .await
        .map_err(|e| AppError::database("my_bookings", e))?;

    let mut bookings = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::database("my_bookings_cursor", e))?
    {
        let booking = cursor
            .deserialize_current()
            .map_err(|e| AppError::Internal(format!("Error deserializing booking: {}", e)))?;
        bookings.push(BookingResponse::from(booking));
    }

    let count = bookings.len();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "bookings": bookings, "count": count },
    })))
}

/// Parses a `sortBy` value like `-createdAt` / `checkIn` into a sort
/// document.
fn sort_doc(sort_by: &str) -> Document {
    let mut sort = Document::new();
    match sort_by.strip_prefix('-') {
        Some(field) => sort.insert(field, -1),
        None => sort.insert(sort_by, 1),
    };
    sort
}

/// All bookings, filtered and paginated (admin/host).
#[get("/api/bookings")]
async fn list_bookings(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    query: web::Query<BookingListQuery>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let claims = authenticate(&repo, &keys, &req).await?;
    require_role(&claims, &["admin", "host"])?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let sort_by = query.sort_by.as_deref().unwrap_or("-createdAt");

    let mut filter = doc! {};
    if let Some(status) = &query.status {
        filter.insert("status", status);
    }

    let total = repo
        .bookings()
        .count_documents(filter.clone())
        .await
        .map_err(|e| AppError::database("count_bookings", e))?;

    let mut cursor = repo
        .bookings()
        .find(filter)
        .sort(sort_doc(sort_by))
        .skip((page - 1) * limit as u64)
        .limit(limit)
        .await
        .map_err(|e| AppError::database("list_bookings", e))?;

    let mut bookings = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::database("list_bookings_cursor", e))?
    {
        let booking = cursor
            .deserialize_current()
            .map_err(|e| AppError::Internal(format!("Error deserializing booking: {}", e)))?;
        bookings.push(BookingResponse::from(booking));
    }

    let pages = (total + limit as u64 - 1) / limit as u64;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "bookings": bookings,
            "pagination": {
                "total": total,
                "page": page,
                "pages": pages,
                "limit": limit,
            },
        },
    })))
}

#[get("/api/bookings/{id}")]
async fn get_booking(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate(&repo, &keys, &req).await?;
    let booking_id = parse_booking_id(&path.into_inner())?;
    let booking = find_booking(&repo, booking_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "booking": BookingResponse::from(booking) },
    })))
}

/// Partial update of status, payment status, dates or guests (admin/host).
#[put("/api/bookings/{id}")]
async fn update_booking(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    data: web::Json<UpdateBookingRequest>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let claims = authenticate(&repo, &keys, &req).await?;
    require_role(&claims, &["admin", "host"])?;

    let booking_id = parse_booking_id(&path.into_inner())?;
    find_booking(&repo, booking_id).await?;

    let mut set = doc! { "updatedAt": DateTime::now() };
    if let Some(status) = data.status {
        set.insert("status", status.as_str());
    }
    if let Some(payment_status) = data.payment_status {
        set.insert("paymentStatus", payment_status.as_str());
    }
    if let Some(check_in) = &data.check_in {
        let parsed = validation::parse_day(check_in, "Check-in")?;
        set.insert("checkIn", DateTime::from_chrono(parsed));
    }
    if let Some(check_out) = &data.check_out {
        let parsed = validation::parse_day(check_out, "Check-out")?;
        set.insert("checkOut", DateTime::from_chrono(parsed));
    }
    if let Some(guests) = data.guests {
        set.insert("guests", guests);
    }

    repo.bookings()
        .update_one(doc! { "_id": booking_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::database("update_booking", e))?;

    let updated = find_booking(&repo, booking_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking updated successfully",
        "data": { "booking": BookingResponse::from(updated) },
    })))
}

/// Cancels a booking while more than 24 hours remain before check-in.
#[patch("/api/bookings/{id}/cancel")]
async fn cancel_booking(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    data: web::Json<CancelBookingRequest>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let claims = authenticate(&repo, &keys, &req).await?;
    let booking_id = parse_booking_id(&path.into_inner())?;
    let booking = find_booking(&repo, booking_id).await?;

    if !booking.can_be_cancelled(Utc::now()) {
        return Err(AppError::Validation(
            "Booking cannot be cancelled (less than 24 hours before check-in or already completed/cancelled)"
                .to_string(),
        ));
    }

    let cancelled_by = ObjectId::parse_str(&claims.sub).ok();
    let mut set = doc! {
        "status": BookingStatus::Cancelled.as_str(),
        "cancelledAt": DateTime::now(),
        "updatedAt": DateTime::now(),
    };
    if let Some(reason) = &data.cancellation_reason {
        set.insert("cancellationReason", reason);
    }
    if let Some(actor) = cancelled_by {
        set.insert("cancelledBy", actor);
    }

    repo.bookings()
        .update_one(doc! { "_id": booking_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::database("cancel_booking", e))?;

    tracing::info!(booking = %booking_id, "Booking cancelled");

    let updated = find_booking(&repo, booking_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "data": { "booking": BookingResponse::from(updated) },
    })))
}

/// Unconditional hard delete (admin).
#[delete("/api/bookings/{id}")]
async fn delete_booking(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let claims = authenticate(&repo, &keys, &req).await?;
    require_role(&claims, &["admin"])?;

    let booking_id = parse_booking_id(&path.into_inner())?;
    find_booking(&repo, booking_id).await?;

    repo.bookings()
        .delete_one(doc! { "_id": booking_id })
        .await
        .map_err(|e| AppError::database("delete_booking", e))?;

    tracing::info!(booking = %booking_id, "Booking deleted");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking deleted successfully",
    })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    // literal paths before `{id}` so they are not captured as ids
    cfg.service(check_availability);
    cfg.service(my_bookings);
    cfg.service(create_booking);
    cfg.service(list_bookings);
    cfg.service(get_booking);
    cfg.service(update_booking);
    cfg.service(cancel_booking);
    cfg.service(delete_booking);
}
