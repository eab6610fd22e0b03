// src/db/mod.rs
pub mod models;
pub mod mongodb;

pub use models::{Admin, Booking, BookingStatus, PaymentStatus, Room, RoomType, User, UserRole};
pub use mongodb::MongoRepo;
