//! Appointment booking over the doctor directory and slot ledger.

pub mod types;
pub mod machine;
pub mod availability;

pub use types::*;
pub use machine::BookingMachine;
pub use availability::{check_availability, AvailabilityQuery};
