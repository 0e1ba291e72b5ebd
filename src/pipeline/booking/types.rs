use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Whether the user has answered the confirmation prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    #[default]
    Unset,
    Confirmed,
    Declined,
}

impl Confirmation {
    /// Reads a yes/no answer. Anything else leaves the booking unconfirmed.
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().trim_end_matches(['.', '!']).to_lowercase().as_str() {
            "yes" | "y" | "yeah" | "yep" | "sure" | "ok" | "okay" | "confirm" => Self::Confirmed,
            "no" | "n" | "nope" | "cancel" => Self::Declined,
            _ => Self::Unset,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingError {
    #[error("Missing doctor name.")]
    MissingDoctor,

    #[error("Please provide both a date (YYYY-MM-DD) and a time (HH:MM).")]
    MissingSlot,

    #[error("❌ Slot already booked with {doctor} on {date} at {time}.")]
    SlotTaken {
        doctor: String,
        date: String,
        time: String,
    },

    #[error("User cancelled.")]
    Cancelled,

    #[error("Doctor '{0}' not found.")]
    DoctorNotFound(String),

    #[error("⚠️ Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("⚠️ Invalid time '{0}'. Use HH:MM.")]
    InvalidTime(String),

    #[error("Booking storage error: {0}")]
    Ledger(String),
}

/// Accumulating record threaded through the booking nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingState {
    pub user_input: String,
    pub doctor_name: String,
    pub specialization: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub city: String,
    pub user_name: String,
    pub phone: String,
    pub age: Option<u32>,
    pub confirmed: Confirmation,
    pub error: Option<BookingError>,
    pub response: String,
    /// Ledger id once the booking is written.
    pub booking_id: Option<Uuid>,
}

impl BookingState {
    pub fn new(user_input: &str) -> Self {
        Self {
            user_input: user_input.to_string(),
            ..Self::default()
        }
    }

    pub fn is_booked(&self) -> bool {
        self.booking_id.is_some()
    }

    /// Records `error` and surfaces its message as the response.
    pub(crate) fn fail(mut self, error: BookingError) -> Self {
        self.response = error.to_string();
        self.error = Some(error);
        self
    }
}
