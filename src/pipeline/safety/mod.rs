//! Red-flag safety classification.
//!
//! Static catalog of symptom patterns, compiled once. Matching is
//! word-boundary and case-insensitive; no provider calls.

pub mod red_flags;

pub use red_flags::*;
