//! Authorization predicates, one per operation.
//!
//! Each predicate takes the acting user and the entity it wants to touch and
//! answers allow/deny. Nothing here talks to the database or to HTTP.

use serde::{Deserialize, Serialize};

use crate::entities::{booking, user::UserRole};
use crate::error::{AppError, AppResult};
use crate::lifecycle::BookingTransition;

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i32,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: i32, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    fn from_bool(allowed: bool) -> Self {
        if allowed { Decision::Allow } else { Decision::Deny }
    }

    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// Turns a denial into `Forbidden` with the given message.
    pub fn or_forbidden(self, message: &str) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AppError::Forbidden(message.to_string())),
        }
    }
}

fn is_driver_of(actor: &Actor, booking: &booking::Model) -> bool {
    booking.driver_id == Some(actor.id)
}

fn is_passenger_of(actor: &Actor, booking: &booking::Model) -> bool {
    booking.passenger_id == actor.id
}

/// accept/start/complete belong to the assigned driver; cancel also to the passenger.
pub fn transition_booking(
    actor: &Actor,
    booking: &booking::Model,
    transition: BookingTransition,
) -> Decision {
    let allowed = match transition {
        BookingTransition::Accept | BookingTransition::Start | BookingTransition::Complete => {
            is_driver_of(actor, booking)
        }
        BookingTransition::Cancel => is_driver_of(actor, booking) || is_passenger_of(actor, booking),
    };
    Decision::from_bool(allowed)
}

pub fn create_booking(actor: &Actor) -> Decision {
    Decision::from_bool(actor.role == UserRole::Passenger)
}

pub fn view_booking(actor: &Actor, booking: &booking::Model) -> Decision {
    Decision::from_bool(
        actor.is_admin() || is_passenger_of(actor, booking) || is_driver_of(actor, booking),
    )
}

pub fn edit_booking_trip(actor: &Actor, booking: &booking::Model) -> Decision {
    Decision::from_bool(actor.is_admin() || is_passenger_of(actor, booking))
}

pub fn set_booking_fare(actor: &Actor, booking: &booking::Model) -> Decision {
    Decision::from_bool(actor.is_admin() || is_driver_of(actor, booking))
}

pub fn delete_booking(actor: &Actor, booking: &booking::Model) -> Decision {
    Decision::from_bool(actor.is_admin() || is_passenger_of(actor, booking))
}

/// Only the booking's passenger pays for it.
pub fn create_payment(actor: &Actor, booking: &booking::Model) -> Decision {
    Decision::from_bool(is_passenger_of(actor, booking))
}

pub fn view_payment(actor: &Actor, booking: &booking::Model) -> Decision {
    view_booking(actor, booking)
}

/// verify/reject, vehicle status, restores and other back-office operations.
pub fn administer(actor: &Actor) -> Decision {
    Decision::from_bool(actor.is_admin())
}

pub fn include_deleted(actor: &Actor, requested: bool) -> Decision {
    Decision::from_bool(!requested || actor.is_admin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::BookingStatus;
    use chrono::Utc;

    fn booking(passenger_id: i32, driver_id: Option<i32>) -> booking::Model {
        let now = Utc::now().fixed_offset();
        booking::Model {
            id: 1,
            passenger_id,
            driver_id,
            vehicle_id: Some(1),
            pickup_location: "Terminal 3".to_string(),
            pickup_lat: 14.5086,
            pickup_lng: 121.0198,
            dropoff_location: "Makati CBD".to_string(),
            dropoff_lat: 14.5547,
            dropoff_lng: 121.0244,
            pickup_time: now,
            status: BookingStatus::Pending,
            fare: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn only_assigned_driver_drives_the_lifecycle() {
        let b = booking(10, Some(20));
        let driver = Actor::new(20, UserRole::Driver);
        let other_driver = Actor::new(21, UserRole::Driver);
        let passenger = Actor::new(10, UserRole::Passenger);
        let admin = Actor::new(1, UserRole::Admin);

        for t in [BookingTransition::Accept, BookingTransition::Start, BookingTransition::Complete] {
            assert!(transition_booking(&driver, &b, t).is_allowed());
            assert!(!transition_booking(&other_driver, &b, t).is_allowed());
            assert!(!transition_booking(&passenger, &b, t).is_allowed());
            assert!(!transition_booking(&admin, &b, t).is_allowed());
        }
    }

    #[test]
    fn passenger_and_driver_may_cancel() {
        let b = booking(10, Some(20));
        assert!(transition_booking(&Actor::new(10, UserRole::Passenger), &b, BookingTransition::Cancel).is_allowed());
        assert!(transition_booking(&Actor::new(20, UserRole::Driver), &b, BookingTransition::Cancel).is_allowed());
        assert!(!transition_booking(&Actor::new(11, UserRole::Passenger), &b, BookingTransition::Cancel).is_allowed());
    }

    #[test]
    fn driverless_booking_cannot_be_accepted() {
        let b = booking(10, None);
        let driver = Actor::new(20, UserRole::Driver);
        assert_eq!(transition_booking(&driver, &b, BookingTransition::Accept), Decision::Deny);
    }

    #[test]
    fn payment_creation_is_passenger_only() {
        let b = booking(10, Some(20));
        assert!(create_payment(&Actor::new(10, UserRole::Passenger), &b).is_allowed());
        assert!(!create_payment(&Actor::new(20, UserRole::Driver), &b).is_allowed());
        assert!(!create_payment(&Actor::new(1, UserRole::Admin), &b).is_allowed());
    }

    #[test]
    fn include_deleted_requires_admin() {
        let passenger = Actor::new(10, UserRole::Passenger);
        assert!(include_deleted(&passenger, false).is_allowed());
        assert!(!include_deleted(&passenger, true).is_allowed());
        assert!(include_deleted(&Actor::new(1, UserRole::Admin), true).is_allowed());
    }

    #[test]
    fn denial_becomes_forbidden() {
        let err = administer(&Actor::new(10, UserRole::Driver))
            .or_forbidden("Admin access required")
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "Admin access required"));
    }
}
