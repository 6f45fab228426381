//! Driver and vehicle selection for new bookings.
//!
//! Selection is "first free match" ordered by ascending id. Both lookups run
//! before the caller mutates anything, so a failure here leaves no trace.

use sea_orm::{ColumnTrait, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::db::soft_delete::{self, Visibility};
use crate::entities::booking::{self, BookingStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::vehicle::{self, VehicleStatus};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Assignment {
    pub driver: user::Model,
    pub vehicle: vehicle::Model,
}

/// Drivers currently on an ONGOING trip.
async fn busy_driver_ids<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<i32>> {
    let ids: Vec<Option<i32>> = soft_delete::scoped::<booking::Entity>(Visibility::ActiveOnly)
        .select_only()
        .column(booking::Column::DriverId)
        .filter(booking::Column::Status.eq(BookingStatus::Ongoing))
        .filter(booking::Column::DriverId.is_not_null())
        .into_tuple()
        .all(conn)
        .await?;

    Ok(ids.into_iter().flatten().collect())
}

/// Lowest-id active driver without an ONGOING booking. PENDING and ACCEPTED
/// bookings do not block a driver.
pub async fn select_driver<C: ConnectionTrait>(conn: &C) -> AppResult<user::Model> {
    let busy = busy_driver_ids(conn).await?;

    let mut query = soft_delete::scoped::<user::Entity>(Visibility::ActiveOnly)
        .filter(user::Column::Role.eq(UserRole::Driver))
        .order_by_asc(user::Column::Id);
    if !busy.is_empty() {
        query = query.filter(user::Column::Id.is_not_in(busy));
    }

    query.one(conn).await?.ok_or(AppError::NoAvailableDriver)
}

/// Lowest-id active AVAILABLE vehicle, locked for the rest of the transaction.
pub async fn select_vehicle<C: ConnectionTrait>(conn: &C) -> AppResult<vehicle::Model> {
    soft_delete::scoped::<vehicle::Entity>(Visibility::ActiveOnly)
        .filter(vehicle::Column::Status.eq(VehicleStatus::Available))
        .order_by_asc(vehicle::Column::Id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(AppError::NoAvailableVehicle)
}

pub async fn select<C: ConnectionTrait>(conn: &C) -> AppResult<Assignment> {
    let driver = select_driver(conn).await?;
    let vehicle = select_vehicle(conn).await?;

    tracing::debug!(driver_id = driver.id, vehicle_id = vehicle.id, "Assignment selected");
    Ok(Assignment { driver, vehicle })
}
