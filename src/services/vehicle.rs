use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Deserializer};

use crate::db::soft_delete::{self, Visibility};
use crate::entities::booking;
use crate::entities::user::{self, UserRole};
use crate::entities::vehicle::{self, VehicleStatus, VehicleType};
use crate::error::{AppError, AppResult};
use crate::policy::{self, Actor};
use crate::services::booking as booking_service;

const MAX_PLATE_LENGTH: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct NewVehicle {
    pub plate_number: String,
    pub vehicle_type: Option<VehicleType>,
    pub driver_id: Option<i32>,
    pub status: Option<VehicleStatus>,
}

/// `driver_id: null` detaches the driver; omitting it leaves the driver as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVehicle {
    pub plate_number: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    #[serde(default, deserialize_with = "double_option")]
    pub driver_id: Option<Option<i32>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn normalize_plate(raw: &str) -> AppResult<String> {
    let plate = raw.trim().to_uppercase();
    if plate.is_empty() {
        return Err(AppError::InvalidArgument("Plate number is required".to_string()));
    }
    if plate.chars().count() > MAX_PLATE_LENGTH {
        return Err(AppError::InvalidArgument(format!(
            "Plate number must be at most {} characters",
            MAX_PLATE_LENGTH
        )));
    }
    Ok(plate)
}

async fn ensure_plate_free<C: ConnectionTrait>(
    conn: &C,
    plate: &str,
    except_id: Option<i32>,
) -> AppResult<()> {
    let mut query = soft_delete::scoped::<vehicle::Entity>(Visibility::IncludeDeleted)
        .filter(vehicle::Column::PlateNumber.eq(plate));
    if let Some(id) = except_id {
        query = query.filter(vehicle::Column::Id.ne(id));
    }

    if query.one(conn).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Plate number {} is already registered",
            plate
        )));
    }
    Ok(())
}

/// The driver must be an active DRIVER that owns no other vehicle.
async fn ensure_driver_assignable<C: ConnectionTrait>(
    conn: &C,
    driver_id: i32,
    except_vehicle: Option<i32>,
) -> AppResult<()> {
    let driver = soft_delete::scoped::<user::Entity>(Visibility::ActiveOnly)
        .filter(user::Column::Id.eq(driver_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::InvalidArgument(format!("User {} does not exist", driver_id)))?;

    if driver.role != UserRole::Driver {
        return Err(AppError::InvalidArgument(format!(
            "User {} is not a driver",
            driver_id
        )));
    }

    let mut owned = soft_delete::scoped::<vehicle::Entity>(Visibility::IncludeDeleted)
        .filter(vehicle::Column::DriverId.eq(driver_id));
    if let Some(id) = except_vehicle {
        owned = owned.filter(vehicle::Column::Id.ne(id));
    }

    if owned.one(conn).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Driver {} already has a vehicle",
            driver_id
        )));
    }
    Ok(())
}

pub async fn list(
    db: &DatabaseConnection,
    actor: &Actor,
    visibility: Visibility,
    status: Option<&str>,
) -> AppResult<Vec<vehicle::Model>> {
    policy::include_deleted(actor, visibility.shows_deleted())
        .or_forbidden("Only admins can list deleted vehicles")?;

    let mut query = soft_delete::scoped::<vehicle::Entity>(visibility);
    if let Some(raw) = status {
        let status: VehicleStatus = raw.parse()?;
        query = query.filter(vehicle::Column::Status.eq(status));
    }

    Ok(query.order_by_asc(vehicle::Column::Id).all(db).await?)
}

pub async fn available(db: &DatabaseConnection) -> AppResult<Vec<vehicle::Model>> {
    Ok(soft_delete::scoped::<vehicle::Entity>(Visibility::ActiveOnly)
        .filter(vehicle::Column::Status.eq(VehicleStatus::Available))
        .order_by_asc(vehicle::Column::Id)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Actor,
    vehicle_id: i32,
    visibility: Visibility,
) -> AppResult<vehicle::Model> {
    policy::include_deleted(actor, visibility.shows_deleted())
        .or_forbidden("Only admins can view deleted vehicles")?;
    soft_delete::find::<vehicle::Entity, _>(db, vehicle_id, visibility).await
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewVehicle,
) -> AppResult<vehicle::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;
    let plate = normalize_plate(&input.plate_number)?;
    if input.status == Some(VehicleStatus::OnTrip) {
        return Err(AppError::InvalidArgument(
            "A new vehicle cannot start ON_TRIP".to_string(),
        ));
    }

    let txn = db.begin().await?;

    ensure_plate_free(&txn, &plate, None).await?;
    if let Some(driver_id) = input.driver_id {
        ensure_driver_assignable(&txn, driver_id, None).await?;
    }

    let now = Utc::now().fixed_offset();
    let vehicle = vehicle::ActiveModel {
        driver_id: Set(input.driver_id),
        vehicle_type: Set(input.vehicle_type),
        plate_number: Set(plate),
        status: Set(input.status.unwrap_or(VehicleStatus::Available)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(vehicle_id = vehicle.id, plate = %vehicle.plate_number, "Vehicle registered");
    Ok(vehicle)
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &Actor,
    vehicle_id: i32,
    input: UpdateVehicle,
) -> AppResult<vehicle::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let vehicle =
        soft_delete::find_for_update::<vehicle::Entity, _>(&txn, vehicle_id, Visibility::ActiveOnly)
            .await?;

    let mut active: vehicle::ActiveModel = vehicle.into();

    if let Some(raw) = input.plate_number {
        let plate = normalize_plate(&raw)?;
        ensure_plate_free(&txn, &plate, Some(vehicle_id)).await?;
        active.plate_number = Set(plate);
    }
    if let Some(vehicle_type) = input.vehicle_type {
        active.vehicle_type = Set(Some(vehicle_type));
    }
    if let Some(driver_id) = input.driver_id {
        if let Some(id) = driver_id {
            ensure_driver_assignable(&txn, id, Some(vehicle_id)).await?;
        }
        active.driver_id = Set(driver_id);
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Set the status from its wire name. The actor is checked before the value
/// is parsed, and the value before the vehicle is looked up. ON_TRIP is only
/// ever set by bookings, and a vehicle held by a live booking keeps its status.
pub async fn update_status(
    db: &DatabaseConnection,
    actor: &Actor,
    vehicle_id: i32,
    raw_status: &str,
) -> AppResult<vehicle::Model> {
    policy::administer(actor).or_forbidden("Only admins can change vehicle status")?;
    let status: VehicleStatus = raw_status.parse()?;
    if status == VehicleStatus::OnTrip {
        return Err(AppError::InvalidTransition(
            "ON_TRIP is set by bookings, not by hand".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let vehicle =
        soft_delete::find_for_update::<vehicle::Entity, _>(&txn, vehicle_id, Visibility::ActiveOnly)
            .await?;

    if let Some(holder) = booking_service::live()
        .filter(booking::Column::VehicleId.eq(vehicle_id))
        .one(&txn)
        .await?
    {
        return Err(AppError::InvalidTransition(format!(
            "Vehicle is held by booking {} in status {}",
            holder.id, holder.status
        )));
    }

    let from = vehicle.status;
    let mut active: vehicle::ActiveModel = vehicle.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(vehicle_id, actor_id = actor.id, from = %from, to = %status, "Vehicle status changed");
    Ok(updated)
}

/// Vehicles in use by a trip cannot be deleted.
pub async fn soft_delete(
    db: &DatabaseConnection,
    actor: &Actor,
    vehicle_id: i32,
) -> AppResult<vehicle::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let vehicle =
        soft_delete::find_for_update::<vehicle::Entity, _>(&txn, vehicle_id, Visibility::ActiveOnly)
            .await?;
    if vehicle.status == VehicleStatus::OnTrip {
        return Err(AppError::InvalidTransition(
            "Cannot delete a vehicle that is ON_TRIP".to_string(),
        ));
    }

    let deleted = soft_delete::soft_delete::<vehicle::Entity, _>(&txn, vehicle_id).await?;
    txn.commit().await?;
    Ok(deleted)
}

pub async fn restore(
    db: &DatabaseConnection,
    actor: &Actor,
    vehicle_id: i32,
) -> AppResult<vehicle::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let restored = soft_delete::restore::<vehicle::Entity, _>(&txn, vehicle_id).await?;
    txn.commit().await?;
    Ok(restored)
}
