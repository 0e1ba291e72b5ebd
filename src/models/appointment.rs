use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// A row of the slot ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Uuid,
    pub user_name: String,
    pub phone: String,
    pub age: Option<u32>,
    pub doctor_name: String,
    pub specialization: String,
    pub contact: Option<String>,
    pub amount: Option<String>,
    pub status: AppointmentStatus,
    pub date: String,
    pub time: String,
    pub created_at: NaiveDateTime,
}
