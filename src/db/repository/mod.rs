//! Repository layer: entity-scoped database operations.
//!
//! `doctor` backs the doctor directory, `appointment` the slot ledger,
//! `report` the saved triage reports.

mod appointment;
mod doctor;
mod report;

pub use appointment::*;
pub use doctor::*;
pub use report::*;
