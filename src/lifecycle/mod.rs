//! Status state machines for bookings and payments.
//!
//! These are pure functions over the current status; persistence and
//! authorization live in `services` and `policy`.

mod booking;
mod payment;

pub use booking::BookingTransition;
pub use payment::PaymentTransition;
