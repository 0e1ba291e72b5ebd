use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SLOT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const SLOT_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
    pub city: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub fee: Option<String>,
}

/// A consultation slot a doctor offers. Dates are `YYYY-MM-DD`, times `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferedSlot {
    pub date: String,
    pub time: String,
}

/// Zero-padded `YYYY-MM-DD`, or `None` if `raw` is not a date.
/// Ledger keys are always stored in this form, so "2025-7-1" and
/// "2025-07-01" name the same slot.
pub fn canonical_date(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw.trim(), SLOT_DATE_FORMAT)
        .ok()
        .map(|d| d.format(SLOT_DATE_FORMAT).to_string())
}

/// Zero-padded `HH:MM`, or `None` if `raw` is not a time of day.
pub fn canonical_time(raw: &str) -> Option<String> {
    NaiveTime::parse_from_str(raw.trim(), SLOT_TIME_FORMAT)
        .ok()
        .map(|t| t.format(SLOT_TIME_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keys_are_zero_padded() {
        assert_eq!(canonical_date("2025-7-1").as_deref(), Some("2025-07-01"));
        assert_eq!(canonical_date(" 2025-07-01 ").as_deref(), Some("2025-07-01"));
        assert_eq!(canonical_time("9:30").as_deref(), Some("09:30"));
        assert_eq!(canonical_time("09:30").as_deref(), Some("09:30"));
    }

    #[test]
    fn malformed_slots_have_no_canonical_form() {
        assert_eq!(canonical_date("01/07/2025"), None);
        assert_eq!(canonical_date("2025-02-30"), None);
        assert_eq!(canonical_time("10am"), None);
        assert_eq!(canonical_time("25:00"), None);
    }
}
