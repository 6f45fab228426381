use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::user::{self, UserRole};
use crate::error::AppResult;
use crate::handlers::ListQuery;
use crate::policy::Actor;
use crate::services::user::{self as user_service, AdminUserUpdate, PasswordChange, ProfileUpdate};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub contact_info: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            contact_info: u.contact_info,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
            deleted_at: u.deleted_at.map(|at| at.with_timezone(&Utc)),
        }
    }
}

fn respond(users: Vec<user::Model>) -> Json<Vec<UserResponse>> {
    Json(users.into_iter().map(UserResponse::from).collect())
}

/// Current user's profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> AppResult<Json<UserResponse>> {
    let user = user_service::find_active(&state.db, actor.id).await?;
    Ok(Json(user.into()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ProfileUpdate>,
) -> AppResult<Json<UserResponse>> {
    let user = user_service::update_profile(&state.db, &actor, payload).await?;
    Ok(Json(user.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<PasswordChange>,
) -> AppResult<Json<serde_json::Value>> {
    user_service::change_password(&state.db, &actor, payload).await?;
    Ok(Json(serde_json::json!({ "message": "Password changed" })))
}

/// List all users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = user_service::list(&state.db, &actor, query.visibility(), None).await?;
    Ok(respond(users))
}

/// List all passengers (admin)
pub async fn list_passengers(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users =
        user_service::list(&state.db, &actor, query.visibility(), Some(UserRole::Passenger)).await?;
    Ok(respond(users))
}

/// List active drivers
pub async fn list_drivers(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    Ok(respond(user_service::drivers(&state.db).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<UserResponse>> {
    let user = user_service::get(&state.db, &actor, id, query.visibility()).await?;
    Ok(Json(user.into()))
}

/// Update name, contact info or role (admin)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(payload): Json<AdminUserUpdate>,
) -> AppResult<Json<UserResponse>> {
    let user = user_service::update(&state.db, &actor, id, payload).await?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserResponse>> {
    let user = user_service::soft_delete(&state.db, &actor, id).await?;
    Ok(Json(user.into()))
}

pub async fn restore_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserResponse>> {
    let user = user_service::restore(&state.db, &actor, id).await?;
    Ok(Json(user.into()))
}
