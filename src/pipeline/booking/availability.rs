//! Free-slot listing for a doctor or specialization.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::db::DatabaseError;
use crate::directory::{DoctorDirectory, SlotLedger};
use crate::models::DoctorRecord;

pub const MISSING_QUERY: &str = "⚠️ Please provide a doctor's name or specialization.";
pub const INVALID_DATE: &str = "⚠️ Invalid date format. Use YYYY-MM-DD.";
pub const LOOKUP_FAILED: &str = "⚠️ Couldn't check availability right now. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub city: Option<String>,
    /// `YYYY-MM-DD`, "today" or "tomorrow".
    pub date: Option<String>,
}

/// Per-doctor availability text, one paragraph per matching doctor.
pub fn check_availability<D: DoctorDirectory, L: SlotLedger>(
    directory: &D,
    ledger: &L,
    query: &AvailabilityQuery,
    today: NaiveDate,
) -> String {
    let name = non_blank(query.name.as_deref());
    let specialization = non_blank(query.specialization.as_deref());
    let city = non_blank(query.city.as_deref());

    let Some(subject) = name.or(specialization) else {
        return MISSING_QUERY.to_string();
    };

    let target = match non_blank(query.date.as_deref()) {
        Some(raw) => match parse_target_date(raw, today) {
            Some(date) => Some(date),
            None => return INVALID_DATE.to_string(),
        },
        None => None,
    };

    match describe(directory, ledger, name, specialization.unwrap_or(""), city, target, today) {
        Ok(lines) if lines.is_empty() => format!(
            "❌ No doctors found matching '{subject}' in {}.",
            city.unwrap_or("your area")
        ),
        Ok(lines) => lines.join("\n\n"),
        Err(e) => {
            tracing::warn!(error = %e, "Availability lookup failed");
            LOOKUP_FAILED.to_string()
        }
    }
}

fn describe<D: DoctorDirectory, L: SlotLedger>(
    directory: &D,
    ledger: &L,
    name: Option<&str>,
    specialization: &str,
    city: Option<&str>,
    target: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Vec<String>, DatabaseError> {
    let doctors = directory.find_doctors(specialization, city, name)?;
    let mut lines = Vec::with_capacity(doctors.len());

    for doctor in &doctors {
        let label = doctor_label(doctor);
        let target_text = target.map(|d| d.format("%Y-%m-%d").to_string());
        let offered = directory.offered_slots(&doctor.id)?;

        if let Some(date) = &target_text {
            if !offered.iter().any(|slot| &slot.date == date) {
                lines.push(format!("⚠️ {label} is not available on {date}."));
                continue;
            }
        }

        let mut free: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for slot in offered {
            let Ok(slot_date) = NaiveDate::parse_from_str(&slot.date, "%Y-%m-%d") else {
                continue;
            };
            if slot_date < today || target.is_some_and(|t| t != slot_date) {
                continue;
            }
            if ledger.exists(&doctor.name, &slot.date, &slot.time)? {
                continue;
            }
            free.entry(slot.date).or_default().push(slot.time);
        }

        if free.is_empty() {
            lines.push(match &target_text {
                Some(date) => format!("❌ {label} has no free slots on {date}."),
                None => format!("❌ {label} has no upcoming free slots."),
            });
            continue;
        }

        let schedule: Vec<String> = free
            .into_iter()
            .map(|(date, times)| format!("{date}: {}", times.join(", ")))
            .collect();
        lines.push(format!("✅ {label} is available at:\n{}", schedule.join("\n")));
    }

    Ok(lines)
}

fn doctor_label(doctor: &DoctorRecord) -> String {
    format!(
        "{} ({} in {})",
        doctor.name,
        doctor.specialization,
        doctor.city.as_deref().unwrap_or("N/A")
    )
}

fn parse_target_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    match raw.to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").ok(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SqliteStore;
    use crate::models::{AppointmentStatus, BookingRecord};
    use uuid::Uuid;

    const SEED: &str = r#"[
        {"name": "Anil Mehta", "specialization": "cardiologist", "city": "Delhi",
         "slots": [
            {"date": "2025-06-30", "time": "09:00"},
            {"date": "2025-07-01", "time": "10:00"},
            {"date": "2025-07-01", "time": "11:00"},
            {"date": "2025-07-02", "time": "09:30"}
         ]},
        {"name": "Kavya Rao", "specialization": "neurologist"}
    ]"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_doctors_json(SEED).unwrap();
        store
    }

    fn book(store: &SqliteStore, date: &str, time: &str) {
        store
            .insert(&BookingRecord {
                id: Uuid::new_v4(),
                user_name: "Asha".into(),
                phone: "1".into(),
                age: None,
                doctor_name: "Anil Mehta".into(),
                specialization: "cardiologist".into(),
                contact: None,
                amount: None,
                status: AppointmentStatus::Pending,
                date: date.into(),
                time: time.into(),
                created_at: chrono::Local::now().naive_local(),
            })
            .unwrap();
    }

    fn by_specialization(specialization: &str) -> AvailabilityQuery {
        AvailabilityQuery {
            specialization: Some(specialization.into()),
            ..Default::default()
        }
    }

    #[test]
    fn groups_free_future_slots_by_date() {
        let store = store();
        book(&store, "2025-07-01", "10:00");
        let text = check_availability(&store, &store, &by_specialization("cardio"), today());
        assert_eq!(
            text,
            "✅ Anil Mehta (cardiologist in Delhi) is available at:\n2025-07-01: 11:00\n2025-07-02: 09:30"
        );
    }

    #[test]
    fn date_without_offered_slots_is_unavailable() {
        let store = store();
        let query = AvailabilityQuery {
            name: Some("mehta".into()),
            date: Some("2025-07-05".into()),
            ..Default::default()
        };
        assert_eq!(
            check_availability(&store, &store, &query, today()),
            "⚠️ Anil Mehta (cardiologist in Delhi) is not available on 2025-07-05."
        );
    }

    #[test]
    fn fully_booked_date_reports_no_free_slots() {
        let store = store();
        book(&store, "2025-07-02", "09:30");
        let query = AvailabilityQuery {
            date: Some("tomorrow".into()),
            ..by_specialization("cardiologist")
        };
        assert_eq!(
            check_availability(&store, &store, &query, today()),
            "❌ Anil Mehta (cardiologist in Delhi) has no free slots on 2025-07-02."
        );
    }

    #[test]
    fn missing_subject_and_bad_date_are_user_errors() {
        let store = store();
        assert_eq!(
            check_availability(&store, &store, &AvailabilityQuery::default(), today()),
            MISSING_QUERY
        );
        let query = AvailabilityQuery {
            date: Some("next week".into()),
            ..by_specialization("cardiologist")
        };
        assert_eq!(check_availability(&store, &store, &query, today()), INVALID_DATE);
    }

    #[test]
    fn no_match_names_the_area() {
        let store = store();
        let query = AvailabilityQuery {
            city: Some("Chennai".into()),
            ..by_specialization("neurologist")
        };
        assert_eq!(
            check_availability(&store, &store, &query, today()),
            "❌ No doctors found matching 'neurologist' in Chennai."
        );
        assert_eq!(
            check_availability(&store, &store, &by_specialization("dentist"), today()),
            "❌ No doctors found matching 'dentist' in your area."
        );
    }

    #[test]
    fn doctors_are_listed_in_separate_paragraphs() {
        let store = store();
        let text = check_availability(&store, &store, &by_specialization("ologist"), today());
        let paragraphs: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1], "❌ Kavya Rao (neurologist in N/A) has no upcoming free slots.");
    }
}
