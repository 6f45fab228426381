//! Domain operations. Each public function is one request-sized unit of work
//! and opens its own transaction when it writes more than one row.

pub mod assignment;
pub mod booking;
pub mod payment;
pub mod user;
pub mod vehicle;
