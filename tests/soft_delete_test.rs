mod common;

use common::*;
use ride_hailing_backend::db::Visibility;
use ride_hailing_backend::entities::booking::BookingStatus;
use ride_hailing_backend::entities::vehicle::VehicleStatus;
use ride_hailing_backend::error::AppError;
use ride_hailing_backend::services::{booking, payment, user, vehicle};

#[tokio::test]
async fn deleted_booking_hides_until_restored() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = actor(&create_admin(&db).await);

    booking::cancel(&db, &actor(&trip.passenger), trip.booking.id)
        .await
        .unwrap();
    let deleted = booking::soft_delete(&db, &actor(&trip.passenger), trip.booking.id)
        .await
        .unwrap();
    assert!(deleted.deleted_at.is_some());

    let active = booking::list(&db, &admin, Visibility::ActiveOnly).await.unwrap();
    assert!(active.is_empty());

    let everything = booking::list(&db, &admin, Visibility::IncludeDeleted).await.unwrap();
    assert_eq!(everything.len(), 1);
    assert_eq!(everything[0].id, trip.booking.id);

    let fetched = booking::get(&db, &admin, trip.booking.id, Visibility::IncludeDeleted)
        .await
        .unwrap();
    assert!(fetched.deleted_at.is_some());

    let restored = booking::restore(&db, &admin, trip.booking.id).await.unwrap();
    assert!(restored.deleted_at.is_none());
    let active = booking::list(&db, &admin, Visibility::ActiveOnly).await.unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn live_booking_must_be_cancelled_first() {
    let db = setup().await;
    let trip = create_trip(&db).await;

    let result = booking::soft_delete(&db, &actor(&trip.passenger), trip.booking.id).await;
    assert!(matches!(result, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn restoring_a_live_row_is_already_in_state() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = actor(&create_admin(&db).await);

    let booking_result = booking::restore(&db, &admin, trip.booking.id).await;
    assert!(matches!(booking_result, Err(AppError::AlreadyInState(_))));

    let vehicle_result = vehicle::restore(&db, &admin, trip.vehicle.id).await;
    assert!(matches!(vehicle_result, Err(AppError::AlreadyInState(_))));

    let user_result = user::restore(&db, &admin, trip.driver.id).await;
    assert!(matches!(user_result, Err(AppError::AlreadyInState(_))));
}

#[tokio::test]
async fn deleting_twice_is_not_found() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let spare = create_vehicle(&db, None, VehicleStatus::Maintenance).await;

    vehicle::soft_delete(&db, &admin, spare.id).await.unwrap();
    let again = vehicle::soft_delete(&db, &admin, spare.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn only_admins_see_deleted_rows() {
    let db = setup().await;
    let passenger = actor(&create_passenger(&db).await);

    let result = booking::list(&db, &passenger, Visibility::IncludeDeleted).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    let result = vehicle::list(&db, &passenger, Visibility::IncludeDeleted, None).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    let result = payment::list(&db, &passenger, Visibility::IncludeDeleted).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn payment_delete_and_restore() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = actor(&create_admin(&db).await);
    let created = payment::create(
        &db,
        &actor(&trip.passenger),
        payment::NewPayment {
            booking_id: trip.booking.id,
            amount: rust_decimal_macros::dec!(180.75),
            payment_method: ride_hailing_backend::entities::payment::PaymentMethod::Gcash,
        },
    )
    .await
    .unwrap();

    payment::soft_delete(&db, &admin, created.id).await.unwrap();
    let hidden = payment::find_by_booking(&db, &actor(&trip.passenger), trip.booking.id).await;
    assert!(matches!(hidden, Err(AppError::NotFound(_))));

    payment::restore(&db, &admin, created.id).await.unwrap();
    let visible = payment::find_by_booking(&db, &actor(&trip.passenger), trip.booking.id)
        .await
        .unwrap();
    assert_eq!(visible.id, created.id);
}

#[tokio::test]
async fn deleted_user_cannot_sign_in() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let registered = user::register(
        &db,
        user::Registration {
            email: "rider@example.com".to_string(),
            password: "s3cure-pass".to_string(),
            name: "Rider".to_string(),
            contact_info: None,
        },
    )
    .await
    .unwrap();

    user::soft_delete(&db, &admin, registered.id).await.unwrap();
    let login = user::authenticate(&db, "rider@example.com", "s3cure-pass").await;
    assert!(matches!(login, Err(AppError::Unauthorized(_))));

    user::restore(&db, &admin, registered.id).await.unwrap();
    user::authenticate(&db, "rider@example.com", "s3cure-pass")
        .await
        .unwrap();
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let db = setup().await;
    let admin_user = create_admin(&db).await;

    let result = user::soft_delete(&db, &actor(&admin_user), admin_user.id).await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn users_with_live_bookings_cannot_be_deleted() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = actor(&create_admin(&db).await);

    for id in [trip.driver.id, trip.passenger.id] {
        let result = user::soft_delete(&db, &admin, id).await;
        assert!(matches!(result, Err(AppError::InvalidTransition(_))), "user {id}");
    }
    let held = booking::get(&db, &admin, trip.booking.id, Visibility::ActiveOnly)
        .await
        .unwrap();
    assert_eq!(held.status, BookingStatus::Pending);
    assert_eq!(held.driver_id, Some(trip.driver.id));

    booking::cancel(&db, &actor(&trip.passenger), trip.booking.id)
        .await
        .unwrap();
    user::soft_delete(&db, &admin, trip.driver.id).await.unwrap();

    let car = find_vehicle(&db, trip.vehicle.id).await;
    assert_eq!(car.driver_id, None);
    assert_eq!(car.status, VehicleStatus::Available);
}

#[tokio::test]
async fn only_deleted_lists_restore_candidates() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let kept = create_vehicle(&db, None, VehicleStatus::Available).await;
    let gone = create_vehicle(&db, None, VehicleStatus::Maintenance).await;
    vehicle::soft_delete(&db, &admin, gone.id).await.unwrap();

    let deleted = vehicle::list(&db, &admin, Visibility::OnlyDeleted, None)
        .await
        .unwrap();
    assert_eq!(deleted.iter().map(|v| v.id).collect::<Vec<_>>(), vec![gone.id]);

    let everything = vehicle::list(&db, &admin, Visibility::IncludeDeleted, None)
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);
    assert!(everything.iter().any(|v| v.id == kept.id));

    let passenger = actor(&create_passenger(&db).await);
    let result = vehicle::list(&db, &passenger, Visibility::OnlyDeleted, None).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}
