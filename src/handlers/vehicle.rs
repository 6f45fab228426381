use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::db::Visibility;
use crate::entities::vehicle;
use crate::error::AppResult;
use crate::policy::Actor;
use crate::services::vehicle::{self as vehicle_service, NewVehicle, UpdateVehicle};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VehicleListQuery {
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default)]
    pub only_deleted: bool,
    pub status: Option<String>,
}

/// Status arrives as a raw string so unknown names surface as `InvalidArgument`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<VehicleListQuery>,
) -> AppResult<Json<Vec<vehicle::Model>>> {
    let vehicles = vehicle_service::list(
        &state.db,
        &actor,
        Visibility::from_flags(query.include_deleted, query.only_deleted),
        query.status.as_deref(),
    )
    .await?;
    Ok(Json(vehicles))
}

pub async fn list_available(State(state): State<AppState>) -> AppResult<Json<Vec<vehicle::Model>>> {
    Ok(Json(vehicle_service::available(&state.db).await?))
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Query(query): Query<VehicleListQuery>,
) -> AppResult<Json<vehicle::Model>> {
    let vehicle =
        vehicle_service::get(&state.db, &actor, id, Visibility::from_flag(query.include_deleted))
            .await?;
    Ok(Json(vehicle))
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewVehicle>,
) -> AppResult<(StatusCode, Json<vehicle::Model>)> {
    let vehicle = vehicle_service::create(&state.db, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateVehicle>,
) -> AppResult<Json<vehicle::Model>> {
    Ok(Json(vehicle_service::update(&state.db, &actor, id, payload).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<vehicle::Model>> {
    let vehicle = vehicle_service::update_status(&state.db, &actor, id, &payload.status).await?;
    Ok(Json(vehicle))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<vehicle::Model>> {
    Ok(Json(vehicle_service::soft_delete(&state.db, &actor, id).await?))
}

pub async fn restore_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<vehicle::Model>> {
    Ok(Json(vehicle_service::restore(&state.db, &actor, id).await?))
}
