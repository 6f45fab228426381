use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, QueryFilter, QueryOrder,
    Select, Set, TransactionTrait,
};
use serde::Deserialize;

use crate::db::soft_delete::{self, Visibility};
use crate::entities::booking::{self, BookingStatus};
use crate::entities::user::UserRole;
use crate::entities::vehicle::{self, VehicleStatus};
use crate::error::{AppError, AppResult};
use crate::lifecycle::BookingTransition;
use crate::policy::{self, Actor};
use crate::services::assignment::{self, Assignment};
use crate::utils::geo::{validate_coordinates, validate_location};

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub pickup_location: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_location: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub pickup_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBooking {
    pub pickup_location: Option<String>,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_location: Option<String>,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub fare: Option<Decimal>,
}

impl UpdateBooking {
    fn touches_trip(&self) -> bool {
        self.pickup_location.is_some()
            || self.pickup_lat.is_some()
            || self.pickup_lng.is_some()
            || self.dropoff_location.is_some()
            || self.dropoff_lat.is_some()
            || self.dropoff_lng.is_some()
            || self.pickup_time.is_some()
    }
}

/// Active bookings that still hold a driver and vehicle.
pub fn live() -> Select<booking::Entity> {
    soft_delete::scoped::<booking::Entity>(Visibility::ActiveOnly)
        .filter(booking::Column::Status.is_in(BookingStatus::LIVE))
}

/// Create a booking for the acting passenger, assigning the first free
/// driver and vehicle. The vehicle flips to ON_TRIP in the same transaction
/// that inserts the booking.
pub async fn create(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewBooking,
) -> AppResult<booking::Model> {
    policy::create_booking(actor).or_forbidden("Only passengers can request bookings")?;

    validate_location("Pickup", &input.pickup_location)?;
    validate_location("Dropoff", &input.dropoff_location)?;
    validate_coordinates("Pickup", input.pickup_lat, input.pickup_lng)?;
    validate_coordinates("Dropoff", input.dropoff_lat, input.dropoff_lng)?;

    let txn = db.begin().await?;

    let Assignment { driver, vehicle } = assignment::select(&txn).await?;
    let vehicle_id = vehicle.id;
    let now = Utc::now().fixed_offset();

    let booking = booking::ActiveModel {
        passenger_id: Set(actor.id),
        driver_id: Set(Some(driver.id)),
        vehicle_id: Set(Some(vehicle_id)),
        pickup_location: Set(input.pickup_location.trim().to_string()),
        pickup_lat: Set(input.pickup_lat),
        pickup_lng: Set(input.pickup_lng),
        dropoff_location: Set(input.dropoff_location.trim().to_string()),
        dropoff_lat: Set(input.dropoff_lat),
        dropoff_lng: Set(input.dropoff_lng),
        pickup_time: Set(input.pickup_time.fixed_offset()),
        status: Set(BookingStatus::Pending),
        fare: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active_vehicle: vehicle::ActiveModel = vehicle.into();
    active_vehicle.status = Set(VehicleStatus::OnTrip);
    active_vehicle.updated_at = Set(now);
    active_vehicle.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = booking.id,
        passenger_id = actor.id,
        driver_id = driver.id,
        vehicle_id,
        "Booking created"
    );
    Ok(booking)
}

/// Mirror a booking transition onto its vehicle. A vehicle row that no longer
/// exists is skipped; deleted vehicles are still updated so a later restore
/// sees consistent state.
async fn mirror_vehicle_status<C: ConnectionTrait>(
    conn: &C,
    vehicle_id: i32,
    status: VehicleStatus,
) -> AppResult<()> {
    let vehicle = match soft_delete::find_for_update::<vehicle::Entity, _>(
        conn,
        vehicle_id,
        Visibility::IncludeDeleted,
    )
    .await
    {
        Ok(vehicle) => vehicle,
        Err(AppError::NotFound(_)) => {
            tracing::warn!(vehicle_id, "Attached vehicle no longer exists");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if vehicle.status == status {
        return Ok(());
    }

    let mut active: vehicle::ActiveModel = vehicle.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(conn).await?;

    tracing::info!(vehicle_id, status = %status, "Vehicle status mirrored from booking");
    Ok(())
}

/// Apply one lifecycle transition. The booking row is locked for the whole
/// read-check-write so concurrent transitions on it serialize.
pub async fn transition(
    db: &DatabaseConnection,
    actor: &Actor,
    booking_id: i32,
    transition: BookingTransition,
) -> AppResult<booking::Model> {
    let txn = db.begin().await?;

    let booking =
        soft_delete::find_for_update::<booking::Entity, _>(&txn, booking_id, Visibility::ActiveOnly)
            .await?;

    let denial = match transition {
        BookingTransition::Cancel => "Only the passenger or the assigned driver can cancel".to_string(),
        other => format!("Only the assigned driver can {}", other),
    };
    policy::transition_booking(actor, &booking, transition).or_forbidden(&denial)?;

    let from = booking.status;
    let to = transition.apply(from)?;
    let vehicle_id = booking.vehicle_id;

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(to);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;

    if let (Some(vehicle_status), Some(vehicle_id)) = (transition.vehicle_effect(), vehicle_id) {
        mirror_vehicle_status(&txn, vehicle_id, vehicle_status).await?;
    }

    txn.commit().await?;

    tracing::info!(
        booking_id,
        actor_id = actor.id,
        from = %from,
        to = %to,
        "Booking transitioned"
    );
    Ok(updated)
}

pub async fn accept(db: &DatabaseConnection, actor: &Actor, booking_id: i32) -> AppResult<booking::Model> {
    transition(db, actor, booking_id, BookingTransition::Accept).await
}

pub async fn start(db: &DatabaseConnection, actor: &Actor, booking_id: i32) -> AppResult<booking::Model> {
    transition(db, actor, booking_id, BookingTransition::Start).await
}

pub async fn complete(db: &DatabaseConnection, actor: &Actor, booking_id: i32) -> AppResult<booking::Model> {
    transition(db, actor, booking_id, BookingTransition::Complete).await
}

pub async fn cancel(db: &DatabaseConnection, actor: &Actor, booking_id: i32) -> AppResult<booking::Model> {
    transition(db, actor, booking_id, BookingTransition::Cancel).await
}

/// Bookings visible to the actor: everything for admins, own trips otherwise.
pub async fn list(
    db: &DatabaseConnection,
    actor: &Actor,
    visibility: Visibility,
) -> AppResult<Vec<booking::Model>> {
    policy::include_deleted(actor, visibility.shows_deleted())
        .or_forbidden("Only admins can list deleted bookings")?;

    let query = soft_delete::scoped::<booking::Entity>(visibility);
    let query = match actor.role {
        UserRole::Admin => query,
        UserRole::Passenger => query.filter(booking::Column::PassengerId.eq(actor.id)),
        UserRole::Driver => query.filter(booking::Column::DriverId.eq(actor.id)),
    };

    Ok(query.order_by_asc(booking::Column::Id).all(db).await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Actor,
    booking_id: i32,
    visibility: Visibility,
) -> AppResult<booking::Model> {
    policy::include_deleted(actor, visibility.shows_deleted())
        .or_forbidden("Only admins can view deleted bookings")?;

    let booking = soft_delete::find::<booking::Entity, _>(db, booking_id, visibility).await?;
    policy::view_booking(actor, &booking).or_forbidden("You are not part of this booking")?;
    Ok(booking)
}

/// Trip details change only while PENDING and only by the passenger or an
/// admin; the fare by the assigned driver or an admin until cancelled.
pub async fn update(
    db: &DatabaseConnection,
    actor: &Actor,
    booking_id: i32,
    input: UpdateBooking,
) -> AppResult<booking::Model> {
    let txn = db.begin().await?;

    let booking =
        soft_delete::find_for_update::<booking::Entity, _>(&txn, booking_id, Visibility::ActiveOnly)
            .await?;

    if input.touches_trip() {
        policy::edit_booking_trip(actor, &booking)
            .or_forbidden("Only the passenger can change trip details")?;
        if booking.status != BookingStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Cannot change trip details of booking in status {} (requires PENDING)",
                booking.status
            )));
        }
    }

    if input.fare.is_some() {
        policy::set_booking_fare(actor, &booking)
            .or_forbidden("Only the assigned driver can set the fare")?;
        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::InvalidTransition(
                "Cannot set the fare of a CANCELLED booking".to_string(),
            ));
        }
    }

    let pickup_lat = input.pickup_lat.unwrap_or(booking.pickup_lat);
    let pickup_lng = input.pickup_lng.unwrap_or(booking.pickup_lng);
    let dropoff_lat = input.dropoff_lat.unwrap_or(booking.dropoff_lat);
    let dropoff_lng = input.dropoff_lng.unwrap_or(booking.dropoff_lng);
    validate_coordinates("Pickup", pickup_lat, pickup_lng)?;
    validate_coordinates("Dropoff", dropoff_lat, dropoff_lng)?;

    let mut active: booking::ActiveModel = booking.into();

    if let Some(location) = input.pickup_location {
        validate_location("Pickup", &location)?;
        active.pickup_location = Set(location.trim().to_string());
    }
    if let Some(location) = input.dropoff_location {
        validate_location("Dropoff", &location)?;
        active.dropoff_location = Set(location.trim().to_string());
    }
    active.pickup_lat = Set(pickup_lat);
    active.pickup_lng = Set(pickup_lng);
    active.dropoff_lat = Set(dropoff_lat);
    active.dropoff_lng = Set(dropoff_lng);

    if let Some(time) = input.pickup_time {
        active.pickup_time = Set(time.fixed_offset());
    }

    if let Some(fare) = input.fare {
        if fare.is_sign_negative() {
            return Err(AppError::InvalidArgument("Fare cannot be negative".to_string()));
        }
        active.fare = Set(Some(fare.round_dp(2)));
    }

    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    Ok(updated)
}

/// Only finished bookings may be hidden; a live one still holds its vehicle.
pub async fn soft_delete(
    db: &DatabaseConnection,
    actor: &Actor,
    booking_id: i32,
) -> AppResult<booking::Model> {
    let txn = db.begin().await?;

    let booking =
        soft_delete::find_for_update::<booking::Entity, _>(&txn, booking_id, Visibility::ActiveOnly)
            .await?;
    policy::delete_booking(actor, &booking).or_forbidden("Only the passenger can delete this booking")?;

    if !booking.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Cannot delete booking in status {} (cancel it first)",
            booking.status
        )));
    }

    let deleted = soft_delete::soft_delete::<booking::Entity, _>(&txn, booking_id).await?;
    txn.commit().await?;
    Ok(deleted)
}

pub async fn restore(
    db: &DatabaseConnection,
    actor: &Actor,
    booking_id: i32,
) -> AppResult<booking::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let restored = soft_delete::restore::<booking::Entity, _>(&txn, booking_id).await?;
    txn.commit().await?;
    Ok(restored)
}
