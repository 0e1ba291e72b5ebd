use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Urgency;

/// A finished triage session saved under the patient's phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomReport {
    pub id: Uuid,
    pub phone: String,
    pub user_name: Option<String>,
    pub session_id: Uuid,
    pub symptoms: Vec<String>,
    pub ai_suggestion: String,
    pub specialist: String,
    pub summary: String,
    pub emergency: bool,
    pub urgency: Urgency,
    pub created_at: NaiveDateTime,
}
