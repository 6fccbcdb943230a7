pub mod request;
pub mod schedule;

pub use request::{BookingRequest, BookingRequestError};
