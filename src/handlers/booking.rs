use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::entities::{booking, payment};
use crate::error::AppResult;
use crate::handlers::ListQuery;
use crate::policy::Actor;
use crate::services::booking::{self as booking_service, NewBooking, UpdateBooking};
use crate::services::payment as payment_service;
use crate::AppState;

/// Request a ride; a driver and vehicle are assigned immediately
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewBooking>,
) -> AppResult<(StatusCode, Json<booking::Model>)> {
    let booking = booking_service::create(&state.db, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<booking::Model>>> {
    Ok(Json(booking_service::list(&state.db, &actor, query.visibility()).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::get(&state.db, &actor, id, query.visibility()).await?))
}

pub async fn update_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBooking>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::update(&state.db, &actor, id, payload).await?))
}

pub async fn accept_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::accept(&state.db, &actor, id).await?))
}

pub async fn start_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::start(&state.db, &actor, id).await?))
}

pub async fn complete_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::complete(&state.db, &actor, id).await?))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::cancel(&state.db, &actor, id).await?))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::soft_delete(&state.db, &actor, id).await?))
}

pub async fn restore_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<booking::Model>> {
    Ok(Json(booking_service::restore(&state.db, &actor, id).await?))
}

/// The payment attached to a booking
pub async fn booking_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<payment::Model>> {
    Ok(Json(payment_service::find_by_booking(&state.db, &actor, id).await?))
}
