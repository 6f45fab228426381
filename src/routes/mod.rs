use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{auth, booking, payment, user, vehicle};
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::user_rate_limit::create_user_governor;
use crate::AppState;

/// Routes behind the bearer token. Role and ownership checks live in the
/// services, so there is no per-role router.
fn protected_routes() -> Router<AppState> {
    let user_routes = Router::new()
        .route("/", get(user::list_users))
        .route("/profile", get(user::profile).put(user::update_profile))
        .route("/change-password", post(user::change_password))
        .route("/drivers", get(user::list_drivers))
        .route("/passengers", get(user::list_passengers))
        .route(
            "/{id}",
            get(user::get_user).put(user::update_user).delete(user::delete_user),
        )
        .route("/{id}/restore", post(user::restore_user));

    let vehicle_routes = Router::new()
        .route("/", get(vehicle::list_vehicles).post(vehicle::create_vehicle))
        .route("/available", get(vehicle::list_available))
        .route(
            "/{id}",
            get(vehicle::get_vehicle)
                .put(vehicle::update_vehicle)
                .delete(vehicle::delete_vehicle),
        )
        .route("/{id}/status", patch(vehicle::update_status))
        .route("/{id}/restore", post(vehicle::restore_vehicle));

    let booking_routes = Router::new()
        .route("/", get(booking::list_bookings).post(booking::create_booking))
        .route(
            "/{id}",
            get(booking::get_booking)
                .put(booking::update_booking)
                .delete(booking::delete_booking),
        )
        .route("/{id}/accept", post(booking::accept_booking))
        .route("/{id}/start", post(booking::start_booking))
        .route("/{id}/complete", post(booking::complete_booking))
        .route("/{id}/cancel", post(booking::cancel_booking))
        .route("/{id}/restore", post(booking::restore_booking))
        .route("/{id}/payment", get(booking::booking_payment));

    let payment_routes = Router::new()
        .route("/", get(payment::list_payments).post(payment::create_payment))
        .route(
            "/{id}",
            get(payment::get_payment)
                .put(payment::update_payment)
                .delete(payment::delete_payment),
        )
        .route("/{id}/verify", patch(payment::verify_payment))
        .route("/{id}/reject", patch(payment::reject_payment))
        .route("/{id}/restore", post(payment::restore_payment));

    Router::new()
        .nest("/users", user_routes)
        .nest("/vehicles", vehicle_routes)
        .nest("/bookings", booking_routes)
        .nest("/payments", payment_routes)
}

pub fn create_router(state: AppState) -> Router {
    // Public routes (per-IP rate limiting)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(create_public_governor());

    // Authenticated routes: auth runs first, then the per-user limiter
    let api_routes = protected_routes()
        .layer(create_user_governor())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .with_state(state)
}
