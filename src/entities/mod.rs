pub mod booking;
pub mod payment;
pub mod user;
pub mod vehicle;
