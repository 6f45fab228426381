use std::fmt;

use crate::entities::booking::BookingStatus;
use crate::entities::vehicle::VehicleStatus;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTransition {
    Accept,
    Start,
    Complete,
    Cancel,
}

impl BookingTransition {
    /// Statuses the booking must be in for the transition to apply.
    pub fn allowed_from(&self) -> &'static [BookingStatus] {
        match self {
            BookingTransition::Accept => &[BookingStatus::Pending],
            BookingTransition::Start => &[BookingStatus::Accepted],
            BookingTransition::Complete => &[BookingStatus::Ongoing],
            BookingTransition::Cancel => &[
                BookingStatus::Pending,
                BookingStatus::Accepted,
                BookingStatus::Ongoing,
            ],
        }
    }

    pub fn target(&self) -> BookingStatus {
        match self {
            BookingTransition::Accept => BookingStatus::Accepted,
            BookingTransition::Start => BookingStatus::Ongoing,
            BookingTransition::Complete => BookingStatus::Completed,
            BookingTransition::Cancel => BookingStatus::Cancelled,
        }
    }

    /// Status the attached vehicle takes as a side effect, if any.
    pub fn vehicle_effect(&self) -> Option<VehicleStatus> {
        match self {
            BookingTransition::Accept => None,
            BookingTransition::Start => Some(VehicleStatus::OnTrip),
            BookingTransition::Complete | BookingTransition::Cancel => {
                Some(VehicleStatus::Available)
            }
        }
    }

    pub fn apply(&self, current: BookingStatus) -> AppResult<BookingStatus> {
        let allowed = self.allowed_from();
        if allowed.contains(&current) {
            return Ok(self.target());
        }

        let required = allowed
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(AppError::InvalidTransition(format!(
            "Cannot {} booking in status {} (requires {})",
            self, current, required
        )))
    }
}

impl fmt::Display for BookingTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            BookingTransition::Accept => "accept",
            BookingTransition::Start => "start",
            BookingTransition::Complete => "complete",
            BookingTransition::Cancel => "cancel",
        };
        f.write_str(verb)
    }
}
