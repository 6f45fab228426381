use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::policy::Actor;
use crate::services;
use crate::utils::jwt::verify_token;
use crate::AppState;

/// Validate the bearer token and attach the acting user to the request.
///
/// The role comes from the user row, so a role change or deletion takes
/// effect immediately instead of when the token expires.
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(auth) =
        auth.ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;

    let user = services::user::find_active(&state.db, claims.sub)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => {
                AppError::Unauthorized("Account no longer exists".to_string())
            }
            other => other,
        })?;

    request.extensions_mut().insert(Actor::new(user.id, user.role));
    Ok(next.run(request).await)
}
