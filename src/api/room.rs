//! Room inventory API.
//!
//! Public endpoints only ever see available rooms; the admin variants see
//! everything and carry the mutations (create, update, delete,
//! toggle-availability).
//!
//! Deleting a room does not touch its bookings; existing reservations keep a
//! dangling reference.

use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse, Responder};
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::middleware::{authenticate_admin, ErrorLogExt};
use super::{AppError, AppResult};
use crate::auth::JwtKeys;
use crate::db::models::{Room, RoomType};
use crate::db::MongoRepo;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    name: Option<String>,
    #[serde(rename = "type")]
    room_type: Option<RoomType>,
    description: Option<String>,
    price: Option<f64>,
    capacity: Option<i32>,
    amenities: Option<Vec<String>>,
    images: Option<Vec<String>>,
    features: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRoomRequest {
    name: Option<String>,
    #[serde(rename = "type")]
    room_type: Option<RoomType>,
    description: Option<String>,
    price: Option<f64>,
    capacity: Option<i32>,
    amenities: Option<Vec<String>>,
    images: Option<Vec<String>>,
    features: Option<Vec<String>>,
    is_available: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomListQuery {
    available: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    capacity: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomResponse {
    id: String,
    name: String,
    #[serde(rename = "type")]
    room_type: RoomType,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    price: f64,
    capacity: i32,
    amenities: Vec<String>,
    images: Vec<String>,
    features: Vec<String>,
    is_available: bool,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        RoomResponse {
            id: room.id.unwrap().to_hex(),
            name: room.name,
            room_type: room.room_type,
            description: room.description,
            price: room.price,
            capacity: room.capacity,
            amenities: room.amenities,
            images: room.images,
            features: room.features,
            is_available: room.is_available,
        }
    }
}

fn parse_room_id(raw: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::Validation("Invalid room ID format".to_string()))
}

async fn collect_rooms(
    repo: &MongoRepo,
    filter: Document,
    sort: Document,
) -> AppResult<Vec<RoomResponse>> {
    let mut cursor = repo
        .rooms()
        .find(filter)
        .sort(sort)
        .await
        .map_err(|e| AppError::database("list_rooms", e))?;

    let mut rooms = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::database("list_rooms_cursor", e))?
    {
        let room = cursor
            .deserialize_current()
            .map_err(|e| AppError::Internal(format!("Error deserializing room: {}", e)))?;
        rooms.push(RoomResponse::from(room));
    }

    Ok(rooms)
}

/// Creates a room (admin).
#[post("/api/rooms")]
async fn create_room(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    data: web::Json<CreateRoomRequest>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate_admin(&repo, &keys, &req).await?;

    let (Some(name), Some(price), Some(capacity)) = (&data.name, data.price, data.capacity) else {
        return Err(AppError::Validation(
            "Please provide name, price, and capacity".to_string(),
        ));
    };

    let Some(room_type) = data.room_type else {
        return Err(AppError::Validation("Room type is required".to_string()));
    };

    let existing = repo
        .rooms()
        .find_one(doc! { "name": name })
        .await
        .log_error_context("checking if room exists")
        .map_err(|e| AppError::database("check_room_exists", e))?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "A room with this name already exists".to_string(),
        ));
    }

    let now = DateTime::now();
    let room = Room {
        id: None,
        name: name.trim().to_string(),
        room_type,
        description: data.description.clone(),
        price,
        capacity,
        amenities: data.amenities.clone().unwrap_or_default(),
        images: data.images.clone().unwrap_or_default(),
        features: data.features.clone().unwrap_or_default(),
        is_available: true,
        created_at: now,
        updated_at: now,
    };

    let result = repo
        .rooms()
        .insert_one(&room)
        .await
        .log_error_context("inserting new room")
        .map_err(|e| AppError::database("create_room", e))?;

    let mut created = room;
    created.id = Some(result.inserted_id.as_object_id().unwrap());

    tracing::info!(room = %created.id.unwrap(), name = %created.name, "Room created");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Room created successfully",
        "data": { "room": RoomResponse::from(created) },
    })))
}

/// Public room listing: available rooms only, cheapest first.
#[get("/api/rooms")]
async fn list_rooms(
    repo: web::Data<MongoRepo>,
    query: web::Query<RoomListQuery>,
) -> AppResult<impl Responder> {
    let mut filter = doc! { "isAvailable": true };

    if query.available.as_deref() == Some("false") {
        filter.remove("isAvailable");
    }

    if query.min_price.is_some() || query.max_price.is_some() {
        let mut price = doc! {};
        if let Some(min) = query.min_price {
            price.insert("$gte", min);
        }
        if let Some(max) = query.max_price {
            price.insert("$lte", max);
        }
        filter.insert("price", price);
    }

    if let Some(capacity) = query.capacity {
        filter.insert("capacity", doc! { "$gte": capacity });
    }

    let rooms = collect_rooms(&repo, filter, doc! { "price": 1 }).await?;
    let count = rooms.len();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": count,
        "data": { "rooms": rooms },
    })))
}

/// Public room detail, only while the room is available.
#[get("/api/rooms/{id}")]
async fn get_room(repo: web::Data<MongoRepo>, path: web::Path<String>) -> AppResult<impl Responder> {
    let room_id = parse_room_id(&path.into_inner())?;

    let room = repo
        .rooms()
        .find_one(doc! { "_id": room_id, "isAvailable": true })
        .await
        .map_err(|e| AppError::database("get_room", e))?
        .ok_or_else(|| AppError::NotFound("Room not found or not available".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "room": RoomResponse::from(room) },
    })))
}

/// Admin listing: every room, newest first.
#[get("/api/admin/rooms")]
async fn list_rooms_admin(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate_admin(&repo, &keys, &req).await?;

    let rooms = collect_rooms(&repo, doc! {}, doc! { "createdAt": -1 }).await?;
    let count = rooms.len();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": count,
        "data": { "rooms": rooms },
    })))
}

/// Admin detail: any room, available or not.
#[get("/api/admin/rooms/{id}")]
async fn get_room_admin(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate_admin(&repo, &keys, &req).await?;
    let room_id = parse_room_id(&path.into_inner())?;

    let room = repo
        .rooms()
        .find_one(doc! { "_id": room_id })
        .await
        .map_err(|e| AppError::database("get_room_admin", e))?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "room": RoomResponse::from(room) },
    })))
}

/// Partial room update (admin).
#[put("/api/rooms/{id}")]
async fn update_room(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    data: web::Json<UpdateRoomRequest>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate_admin(&repo, &keys, &req).await?;
    let room_id = parse_room_id(&path.into_inner())?;

    let mut set = doc! { "updatedAt": DateTime::now() };
    if let Some(name) = &data.name {
        set.insert("name", name.trim());
    }
    if let Some(room_type) = data.room_type {
        set.insert("type", room_type.as_str());
    }
    if let Some(description) = &data.description {
        set.insert("description", description);
    }
    if let Some(price) = data.price {
        set.insert("price", price);
    }
    if let Some(capacity) = data.capacity {
        set.insert("capacity", capacity);
    }
    if let Some(amenities) = &data.amenities {
        set.insert("amenities", amenities.clone());
    }
    if let Some(images) = &data.images {
        set.insert("images", images.clone());
    }
    if let Some(features) = &data.features {
        set.insert("features", features.clone());
    }
    if let Some(is_available) = data.is_available {
        set.insert("isAvailable", is_available);
    }

    let result = repo
        .rooms()
        .update_one(doc! { "_id": room_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::database("update_room", e))?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Room not found".to_string()));
    }

    let room = repo
        .rooms()
        .find_one(doc! { "_id": room_id })
        .await
        .map_err(|e| AppError::database("update_room_read_back", e))?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Room updated successfully",
        "data": { "room": RoomResponse::from(room) },
    })))
}

/// Hard delete (admin). Existing bookings are left untouched.
#[delete("/api/rooms/{id}")]
async fn delete_room(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate_admin(&repo, &keys, &req).await?;
    let room_id = parse_room_id(&path.into_inner())?;

    let result = repo
        .rooms()
        .delete_one(doc! { "_id": room_id })
        .await
        .map_err(|e| AppError::database("delete_room", e))?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Room not found".to_string()));
    }

    tracing::info!(room = %room_id, "Room deleted");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Room deleted successfully",
    })))
}

/// Flips the availability flag (admin).
#[patch("/api/rooms/{id}/toggle-availability")]
async fn toggle_availability(
    repo: web::Data<MongoRepo>,
    keys: web::Data<JwtKeys>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    authenticate_admin(&repo, &keys, &req).await?;
    let room_id = parse_room_id(&path.into_inner())?;

    let room = repo
        .rooms()
        .find_one(doc! { "_id": room_id })
        .await
        .map_err(|e| AppError::database("toggle_availability", e))?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    let now_available = !room.is_available;
    repo.rooms()
        .update_one(
            doc! { "_id": room_id },
            doc! { "$set": { "isAvailable": now_available, "updatedAt": DateTime::now() } },
        )
        .await
        .map_err(|e| AppError::database("toggle_availability", e))?;

    tracing::info!(room = %room.name, available = now_available, "Room availability toggled");

    let mut updated = room;
    updated.is_available = now_available;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!(
            "Room {} successfully",
            if now_available { "enabled" } else { "disabled" }
        ),
        "data": { "room": RoomResponse::from(updated) },
    })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_room);
    cfg.service(list_rooms);
    cfg.service(list_rooms_admin);
    cfg.service(get_room_admin);
    cfg.service(get_room);
    cfg.service(update_room);
    cfg.service(delete_room);
    cfg.service(toggle_availability);
}
