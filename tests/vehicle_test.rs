mod common;

use common::*;
use ride_hailing_backend::db::Visibility;
use ride_hailing_backend::entities::vehicle::{VehicleStatus, VehicleType};
use ride_hailing_backend::error::AppError;
use ride_hailing_backend::services::booking;
use ride_hailing_backend::services::vehicle::{self, NewVehicle, UpdateVehicle};

fn new_vehicle(plate: &str, driver_id: Option<i32>) -> NewVehicle {
    NewVehicle {
        plate_number: plate.to_string(),
        vehicle_type: Some(VehicleType::Car),
        driver_id,
        status: None,
    }
}

#[tokio::test]
async fn admin_sets_status_by_wire_name() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let car = create_vehicle(&db, None, VehicleStatus::Available).await;

    let updated = vehicle::update_status(&db, &admin, car.id, "MAINTENANCE")
        .await
        .unwrap();
    assert_eq!(updated.status, VehicleStatus::Maintenance);
}

#[tokio::test]
async fn unknown_status_is_invalid_argument() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let car = create_vehicle(&db, None, VehicleStatus::Available).await;

    for raw in ["Available", "on_trip", "PARKED", ""] {
        let result = vehicle::update_status(&db, &admin, car.id, raw).await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))), "{raw}");
    }
    assert_eq!(find_vehicle(&db, car.id).await.status, VehicleStatus::Available);
}

#[tokio::test]
async fn non_admin_cannot_change_status() {
    let db = setup().await;
    let driver = create_driver(&db).await;
    let car = create_vehicle(&db, Some(driver.id), VehicleStatus::Available).await;

    let result = vehicle::update_status(&db, &actor(&driver), car.id, "MAINTENANCE").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn status_filter_uses_the_same_vocabulary() {
    let db = setup().await;
    let passenger = actor(&create_passenger(&db).await);
    create_vehicle(&db, None, VehicleStatus::Available).await;
    create_vehicle(&db, None, VehicleStatus::Maintenance).await;

    let in_shop = vehicle::list(&db, &passenger, Visibility::ActiveOnly, Some("MAINTENANCE"))
        .await
        .unwrap();
    assert_eq!(in_shop.len(), 1);
    assert_eq!(in_shop[0].status, VehicleStatus::Maintenance);

    let bad = vehicle::list(&db, &passenger, Visibility::ActiveOnly, Some("maintenance")).await;
    assert!(matches!(bad, Err(AppError::InvalidArgument(_))));

    assert_eq!(vehicle::available(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn plates_and_drivers_are_unique() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let driver = create_driver(&db).await;

    let created = vehicle::create(&db, &admin, new_vehicle(" abc 123 ", Some(driver.id)))
        .await
        .unwrap();
    assert_eq!(created.plate_number, "ABC 123");
    assert_eq!(created.status, VehicleStatus::Available);

    let same_plate = vehicle::create(&db, &admin, new_vehicle("ABC 123", None)).await;
    assert!(matches!(same_plate, Err(AppError::Conflict(_))));

    let same_driver = vehicle::create(&db, &admin, new_vehicle("XYZ 789", Some(driver.id))).await;
    assert!(matches!(same_driver, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn owner_must_be_an_active_driver() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let passenger = create_passenger(&db).await;

    let result = vehicle::create(&db, &admin, new_vehicle("PAS 001", Some(passenger.id))).await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));

    let result = vehicle::create(&db, &admin, new_vehicle("GHO 001", Some(999))).await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn driver_can_be_detached() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let driver = create_driver(&db).await;
    let car = create_vehicle(&db, Some(driver.id), VehicleStatus::Available).await;

    let detach = UpdateVehicle {
        driver_id: Some(None),
        ..Default::default()
    };
    let updated = vehicle::update(&db, &admin, car.id, detach).await.unwrap();
    assert_eq!(updated.driver_id, None);
}

#[tokio::test]
async fn vehicle_on_trip_cannot_be_deleted() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = actor(&create_admin(&db).await);

    let result = vehicle::soft_delete(&db, &admin, trip.vehicle.id).await;
    assert!(matches!(result, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn vehicle_held_by_live_booking_keeps_its_status() {
    let db = setup().await;
    let trip = create_trip(&db).await;
    let admin = actor(&create_admin(&db).await);

    for raw in ["AVAILABLE", "MAINTENANCE"] {
        let result = vehicle::update_status(&db, &admin, trip.vehicle.id, raw).await;
        assert!(matches!(result, Err(AppError::InvalidTransition(_))), "{raw}");
    }
    assert_eq!(find_vehicle(&db, trip.vehicle.id).await.status, VehicleStatus::OnTrip);

    // The held vehicle is never handed to a second booking
    let other = create_passenger(&db).await;
    let second = booking::create(&db, &actor(&other), new_booking()).await;
    assert!(matches!(second, Err(AppError::NoAvailableVehicle)));

    booking::cancel(&db, &actor(&trip.passenger), trip.booking.id)
        .await
        .unwrap();
    let updated = vehicle::update_status(&db, &admin, trip.vehicle.id, "MAINTENANCE")
        .await
        .unwrap();
    assert_eq!(updated.status, VehicleStatus::Maintenance);
}

#[tokio::test]
async fn on_trip_is_never_set_by_hand() {
    let db = setup().await;
    let admin = actor(&create_admin(&db).await);
    let car = create_vehicle(&db, None, VehicleStatus::Available).await;

    let result = vehicle::update_status(&db, &admin, car.id, "ON_TRIP").await;
    assert!(matches!(result, Err(AppError::InvalidTransition(_))));
    assert_eq!(find_vehicle(&db, car.id).await.status, VehicleStatus::Available);

    let input = NewVehicle {
        status: Some(VehicleStatus::OnTrip),
        ..new_vehicle("ONT 001", None)
    };
    let result = vehicle::create(&db, &admin, input).await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}
