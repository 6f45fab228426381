mod common;

use common::*;
use ride_hailing_backend::db::Visibility;
use ride_hailing_backend::entities::payment::{PaymentMethod, PaymentStatus};
use ride_hailing_backend::error::AppError;
use ride_hailing_backend::services::payment::{self, NewPayment, UpdatePayment};
use rust_decimal_macros::dec;

fn cash(booking_id: i32) -> NewPayment {
    NewPayment {
        booking_id,
        amount: dec!(320.50),
        payment_method: PaymentMethod::Cash,
    }
}

#[tokio::test]
async fn passenger_pays_for_own_booking() {
    let db = setup().await;
    let trip = create_trip(&db).await;

    let created = payment::create(&db, &actor(&trip.passenger), cash(trip.booking.id))
        .await
        .unwrap();
    assert_eq!(created.status, PaymentStatus::Pending);
    assert_eq!(created.booking_id, trip.booking.id);

    let found = payment::find_by_booking(&db, &actor(&trip.driver), trip.booking.id)
        .await
        .unwrap();
    assert_eq!(found.id, created.id);
}

#[tokio::test]
async fn only_the_passenger_can_pay() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = create_admin(&db).await;

    for payer in [&trip.driver, &admin] {
        let result = payment::create(&db, &actor(payer), cash(trip.booking.id)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}

#[tokio::test]
async fn paying_for_missing_booking_is_not_found() {
    let db = setup().await;
    let passenger = create_passenger(&db).await;

    let result = payment::create(&db, &actor(&passenger), cash(404)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn second_payment_conflicts() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let passenger = actor(&trip.passenger);

    payment::create(&db, &passenger, cash(trip.booking.id)).await.unwrap();
    let again = payment::create(&db, &passenger, cash(trip.booking.id)).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn zero_amount_is_rejected() {
    let db = setup().await;
    let trip = create_trip(&db).await;

    let mut input = cash(trip.booking.id);
    input.amount = dec!(0);
    let result = payment::create(&db, &actor(&trip.passenger), input).await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn verification_is_admin_only_and_happens_once() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = create_admin(&db).await;
    let created = payment::create(&db, &actor(&trip.passenger), cash(trip.booking.id))
        .await
        .unwrap();

    let by_driver = payment::verify(&db, &actor(&trip.driver), created.id).await;
    assert!(matches!(by_driver, Err(AppError::Forbidden(_))));

    let verified = payment::verify(&db, &actor(&admin), created.id).await.unwrap();
    assert_eq!(verified.status, PaymentStatus::Completed);

    let again = payment::verify(&db, &actor(&admin), created.id).await;
    assert!(matches!(again, Err(AppError::InvalidTransition(_))));

    let reject = payment::reject(&db, &actor(&admin), created.id).await;
    assert!(matches!(reject, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn rejected_payment_is_failed() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = create_admin(&db).await;
    let created = payment::create(&db, &actor(&trip.passenger), cash(trip.booking.id))
        .await
        .unwrap();

    let rejected = payment::reject(&db, &actor(&admin), created.id).await.unwrap();
    assert_eq!(rejected.status, PaymentStatus::Failed);

    let edit = UpdatePayment {
        amount: Some(dec!(100.25)),
        ..Default::default()
    };
    let result = payment::update(&db, &actor(&admin), created.id, edit).await;
    assert!(matches!(result, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn verifying_unknown_payment_is_not_found() {
    let db = setup().await;
    let admin = create_admin(&db).await;

    let result = payment::verify(&db, &actor(&admin), 77).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn payments_are_listed_per_participant() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let stranger = create_passenger(&db).await;
    payment::create(&db, &actor(&trip.passenger), cash(trip.booking.id))
        .await
        .unwrap();

    let own = payment::list(&db, &actor(&trip.passenger), Visibility::ActiveOnly).await.unwrap();
    assert_eq!(own.len(), 1);
    let driver = payment::list(&db, &actor(&trip.driver), Visibility::ActiveOnly).await.unwrap();
    assert_eq!(driver.len(), 1);
    let none = payment::list(&db, &actor(&stranger), Visibility::ActiveOnly).await.unwrap();
    assert!(none.is_empty());
}
