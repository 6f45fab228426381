use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::entities::payment;
use crate::error::AppResult;
use crate::handlers::ListQuery;
use crate::policy::Actor;
use crate::services::payment::{self as payment_service, NewPayment, UpdatePayment};
use crate::AppState;

pub async fn create_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewPayment>,
) -> AppResult<(StatusCode, Json<payment::Model>)> {
    let payment = payment_service::create(&state.db, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<payment::Model>>> {
    Ok(Json(payment_service::list(&state.db, &actor, query.visibility()).await?))
}

/// Get a payment (admin)
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<payment::Model>> {
    Ok(Json(payment_service::get(&state.db, &actor, id, query.visibility()).await?))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePayment>,
) -> AppResult<Json<payment::Model>> {
    Ok(Json(payment_service::update(&state.db, &actor, id, payload).await?))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<payment::Model>> {
    Ok(Json(payment_service::verify(&state.db, &actor, id).await?))
}

pub async fn reject_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<payment::Model>> {
    Ok(Json(payment_service::reject(&state.db, &actor, id).await?))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<payment::Model>> {
    Ok(Json(payment_service::soft_delete(&state.db, &actor, id).await?))
}

pub async fn restore_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<payment::Model>> {
    Ok(Json(payment_service::restore(&state.db, &actor, id).await?))
}
