use mongodb::{Client, Collection, Database};
use std::env;

use crate::api::AppError;
use crate::db::models::{Admin, Booking, Room, User};

pub type Result<T> = std::result::Result<T, AppError>;

/// Shared handle to the booking database.
#[derive(Debug, Clone)]
pub struct MongoRepo {
    pub client: Client,
    pub database: Database,
}

impl MongoRepo {
    /// Connects using `MONGODB_URI` / `MONGODB_DATABASE` and pings the
    /// server so a bad URI fails at startup instead of on the first request.
    pub async fn init() -> Result<MongoRepo> {
        let mongo_uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let client = Client::with_uri_str(&mongo_uri)
            .await
            .map_err(|e| AppError::Internal(format!("Error connecting to MongoDB: {}", e)))?;

        let database_name =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| "aamantran_booking".to_string());

        let database = client.database(&database_name);

        // Test connection
        database
            .run_command(mongodb::bson::doc! {"ping": 1})
            .await
            .map_err(|e| AppError::Internal(format!("Error validating MongoDB connection: {}", e)))?;

        tracing::info!(database = %database_name, "MongoDB connection established");

        Ok(MongoRepo { client, database })
    }

    pub fn rooms(&self) -> Collection<Room> {
        self.database.collection("rooms")
    }

    pub fn bookings(&self) -> Collection<Booking> {
        self.database.collection("bookings")
    }

    pub fn admins(&self) -> Collection<Admin> {
        self.database.collection("admins")
    }

    pub fn users(&self) -> Collection<User> {
        self.database.collection("users")
    }

    /// Creates the indexes the query paths rely on.
    ///
    /// The booking index accelerates the overlap query; it is NOT an
    /// exclusion constraint, so the conflict check remains read-then-write
    /// (two concurrent creations can still both pass).
    pub async fn create_indexes(&self) -> Result<()> {
        use mongodb::bson::doc;
        use mongodb::{options::IndexOptions, IndexModel};

        let rooms = self.rooms();
        let room_indexes = vec![IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()];

        rooms
            .create_indexes(room_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creating room indexes: {}", e)))?;

        let bookings = self.bookings();
        let booking_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "room": 1, "checkIn": 1, "checkOut": 1 })
                .build(),
            IndexModel::builder().keys(doc! { "status": 1 }).build(),
            IndexModel::builder().keys(doc! { "user": 1 }).build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
        ];

        bookings
            .create_indexes(booking_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creating booking indexes: {}", e)))?;

        let admins = self.admins();
        let admin_indexes = vec![IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()];

        admins
            .create_indexes(admin_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creating admin indexes: {}", e)))?;

        let users = self.users();
        let user_indexes = vec![IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()];

        users
            .create_indexes(user_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creating user indexes: {}", e)))?;

        tracing::info!("MongoDB indexes created");
        Ok(())
    }
}
