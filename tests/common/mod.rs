//! Shared setup for integration tests: an in-memory SQLite database built
//! from the entities, plus factories with sensible defaults.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};
use sea_orm::{
    sea_query::TableCreateStatement, ActiveModelTrait, ConnectionTrait, Database,
    DatabaseConnection, DbBackend, DbErr, EntityTrait, Schema, Set,
};

use ride_hailing_backend::entities::{booking, payment, user, vehicle};
use ride_hailing_backend::entities::user::UserRole;
use ride_hailing_backend::entities::vehicle::VehicleStatus;
use ride_hailing_backend::policy::Actor;
use ride_hailing_backend::services::booking::NewBooking;

static COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn next_id() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Builder for the test database. Tables are created in the order added,
/// so referenced tables must come first.
pub struct TestBuilder {
    tables: Vec<TableCreateStatement>,
}

impl TestBuilder {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn with_table<E: EntityTrait>(mut self, entity: E) -> Self {
        let schema = Schema::new(DbBackend::Sqlite);
        self.tables.push(schema.create_table_from_entity(entity));
        self
    }

    /// User, Vehicle, Booking and Payment.
    pub fn with_all_tables(self) -> Self {
        self.with_table(user::Entity)
            .with_table(vehicle::Entity)
            .with_table(booking::Entity)
            .with_table(payment::Entity)
    }

    pub async fn build(self) -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        for stmt in self.tables {
            db.execute(db.get_database_backend().build(&stmt)).await?;
        }
        Ok(db)
    }
}

pub async fn setup() -> DatabaseConnection {
    TestBuilder::new()
        .with_all_tables()
        .build()
        .await
        .expect("test database")
}

pub fn actor(user: &user::Model) -> Actor {
    Actor::new(user.id, user.role)
}

pub async fn create_user(db: &DatabaseConnection, role: UserRole) -> user::Model {
    let id = next_id();
    let now = Utc::now().fixed_offset();
    user::ActiveModel {
        email: Set(format!("user{}@example.com", id)),
        // Not a real hash; factory users never log in
        password_hash: Set("unused".to_string()),
        name: Set(format!("User {}", id)),
        contact_info: Set(None),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn create_passenger(db: &DatabaseConnection) -> user::Model {
    create_user(db, UserRole::Passenger).await
}

pub async fn create_driver(db: &DatabaseConnection) -> user::Model {
    create_user(db, UserRole::Driver).await
}

pub async fn create_admin(db: &DatabaseConnection) -> user::Model {
    create_user(db, UserRole::Admin).await
}

pub async fn create_vehicle(
    db: &DatabaseConnection,
    driver_id: Option<i32>,
    status: VehicleStatus,
) -> vehicle::Model {
    let id = next_id();
    let now = Utc::now().fixed_offset();
    vehicle::ActiveModel {
        driver_id: Set(driver_id),
        vehicle_type: Set(None),
        plate_number: Set(format!("TST {}", id)),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert vehicle")
}

pub fn new_booking() -> NewBooking {
    NewBooking {
        pickup_location: "NAIA Terminal 3".to_string(),
        pickup_lat: 14.5203,
        pickup_lng: 121.0198,
        dropoff_location: "Ayala Avenue, Makati".to_string(),
        dropoff_lat: 14.5547,
        dropoff_lng: 121.0244,
        pickup_time: Utc::now() + Duration::hours(1),
    }
}

pub async fn find_vehicle(db: &DatabaseConnection, id: i32) -> vehicle::Model {
    vehicle::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query vehicle")
        .expect("vehicle exists")
}

pub async fn booking_count(db: &DatabaseConnection) -> usize {
    booking::Entity::find().all(db).await.expect("query bookings").len()
}

/// One passenger, one driver, one AVAILABLE vehicle and a PENDING booking
/// between them.
pub struct Trip {
    pub passenger: user::Model,
    pub driver: user::Model,
    pub vehicle: vehicle::Model,
    pub booking: booking::Model,
}

pub async fn create_trip(db: &DatabaseConnection) -> Trip {
    let passenger = create_passenger(db).await;
    let driver = create_driver(db).await;
    let vehicle = create_vehicle(db, Some(driver.id), VehicleStatus::Available).await;
    let booking = ride_hailing_backend::services::booking::create(db, &actor(&passenger), new_booking())
        .await
        .expect("create booking");
    Trip {
        passenger,
        driver,
        vehicle,
        booking,
    }
}
