//! Four-node booking flow: parse → check slot → confirm, ask, or cancel.
//!
//! Each node takes and returns the whole `BookingState`. Once a node sets
//! `error`, no later node runs and the state is returned as is.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{BookingError, BookingState, Confirmation};
use crate::db::DatabaseError;
use crate::directory::{DoctorDirectory, LedgerInsert, SlotLedger};
use crate::models::{canonical_date, canonical_time, AppointmentStatus, BookingRecord};

/// "Dr. Mehta", "dr mehta", "Doctor Mehta". Requires a dot or space after
/// "dr" so words like "drink" don't match.
static DOCTOR_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:dr(?:\.\s*|\s+)|doctor\s+)([a-z]\w*)")
        .expect("Invalid doctor mention pattern")
});

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:dr\.?|doctor)\s+").expect("Invalid title pattern")
});

pub struct BookingMachine<'a, D: DoctorDirectory, L: SlotLedger> {
    directory: &'a D,
    ledger: &'a L,
}

impl<'a, D: DoctorDirectory, L: SlotLedger> BookingMachine<'a, D, L> {
    pub fn new(directory: &'a D, ledger: &'a L) -> Self {
        Self { directory, ledger }
    }

    /// Runs one pass of the flow. Call again with `confirmed` set after the
    /// user answers the prompt.
    pub fn run(&self, state: BookingState) -> BookingState {
        let state = self.parse_doctor_and_specialization(state);
        if state.error.is_some() {
            return state;
        }
        let state = self.check_slot_availability(state);
        if state.error.is_some() {
            tracing::info!(error = ?state.error, "Booking stopped before confirmation");
            return state;
        }
        match state.confirmed {
            Confirmation::Unset => ask_confirmation(state),
            Confirmation::Declined => cancel(state),
            Confirmation::Confirmed => self.confirm_booking(state),
        }
    }

    /// Fills `doctor_name` and `specialization` from the free text when the
    /// caller left them blank. A name that resolves in the directory is
    /// replaced by the directory's spelling so ledger keys stay canonical.
    pub fn parse_doctor_and_specialization(&self, mut state: BookingState) -> BookingState {
        if state.doctor_name.trim().is_empty() {
            match self.extract_doctor_name(&state.user_input) {
                Ok(Some(name)) => state.doctor_name = name,
                Ok(None) => {}
                Err(e) => return state.fail(BookingError::Ledger(e.to_string())),
            }
        }

        if state.specialization.trim().is_empty() {
            let query = word_padded(&state.user_input);
            match self.directory.list_specializations() {
                Ok(specializations) => {
                    if let Some(found) = specializations
                        .into_iter()
                        .find(|s| !s.trim().is_empty() && query.contains(&word_padded(s)))
                    {
                        state.specialization = found;
                    }
                }
                Err(e) => return state.fail(BookingError::Ledger(e.to_string())),
            }
        }

        let name = strip_title(&state.doctor_name);
        if !name.is_empty() {
            let specialization = Some(state.specialization.as_str()).filter(|s| !s.is_empty());
            match self.directory.find_doctor_by_fuzzy_name(&name, specialization) {
                Ok(Some(doctor)) => {
                    state.doctor_name = doctor.name;
                    if state.specialization.is_empty() {
                        state.specialization = doctor.specialization;
                    }
                }
                Ok(None) => state.doctor_name = name,
                Err(e) => return state.fail(BookingError::Ledger(e.to_string())),
            }
        }

        tracing::debug!(
            doctor = %state.doctor_name,
            specialization = %state.specialization,
            "Parsed booking request"
        );
        state
    }

    /// Validates the requested slot and rewrites it zero-padded, so
    /// "2025-7-1 9:30" and "2025-07-01 09:30" hit the same ledger key.
    pub fn check_slot_availability(&self, mut state: BookingState) -> BookingState {
        if state.doctor_name.trim().is_empty() {
            return state.fail(BookingError::MissingDoctor);
        }
        if !state.date.is_empty() {
            match canonical_date(&state.date) {
                Some(date) => state.date = date,
                None => {
                    let date = state.date.clone();
                    return state.fail(BookingError::InvalidDate(date));
                }
            }
        }
        if !state.time.is_empty() {
            match canonical_time(&state.time) {
                Some(time) => state.time = time,
                None => {
                    let time = state.time.clone();
                    return state.fail(BookingError::InvalidTime(time));
                }
            }
        }
        if state.date.is_empty() || state.time.is_empty() {
            return state;
        }

        match self.ledger.exists(&state.doctor_name, &state.date, &state.time) {
            Ok(false) => state,
            Ok(true) => {
                let error = slot_taken(&state);
                state.fail(error)
            }
            Err(e) => state.fail(BookingError::Ledger(e.to_string())),
        }
    }

    pub fn confirm_booking(&self, state: BookingState) -> BookingState {
        if state.date.is_empty() || state.time.is_empty() {
            return state.fail(BookingError::MissingSlot);
        }

        let specialization = Some(state.specialization.as_str()).filter(|s| !s.is_empty());
        let doctor = match self
            .directory
            .find_doctor_by_fuzzy_name(&state.doctor_name, specialization)
        {
            Ok(Some(doctor)) => doctor,
            Ok(None) => {
                let name = state.doctor_name.clone();
                return state.fail(BookingError::DoctorNotFound(name));
            }
            Err(e) => return state.fail(BookingError::Ledger(e.to_string())),
        };

        let record = BookingRecord {
            id: uuid::Uuid::new_v4(),
            user_name: state.user_name.clone(),
            phone: state.phone.clone(),
            age: state.age,
            doctor_name: doctor.name.clone(),
            specialization: if state.specialization.is_empty() {
                doctor.specialization.clone()
            } else {
                state.specialization.clone()
            },
            contact: doctor.contact.clone(),
            amount: doctor.fee.clone(),
            status: AppointmentStatus::Pending,
            date: state.date.clone(),
            time: state.time.clone(),
            created_at: chrono::Local::now().naive_local(),
        };

        match self.ledger.insert(&record) {
            Ok(LedgerInsert::Inserted) => {
                tracing::info!(booking_id = %record.id, "Appointment booked");
                let mut state = state;
                state.response = format!(
                    "✅ Appointment booked with Dr. {} on {} at {}.",
                    record.doctor_name, record.date, record.time
                );
                state.doctor_name = record.doctor_name;
                state.booking_id = Some(record.id);
                state
            }
            Ok(LedgerInsert::Conflict) => {
                let error = slot_taken(&state);
                state.fail(error)
            }
            Err(e) => state.fail(BookingError::Ledger(e.to_string())),
        }
    }

    /// Explicit "Dr./Doctor <name>" mention, else the first directory doctor
    /// with a name part that appears in the text.
    fn extract_doctor_name(&self, text: &str) -> Result<Option<String>, DatabaseError> {
        if let Some(caps) = DOCTOR_MENTION.captures(text) {
            return Ok(Some(caps[1].to_string()));
        }

        let query = word_padded(text);
        for doctor in self.directory.list_doctors()? {
            let cleaned = strip_title(&doctor.name);
            if cleaned
                .split_whitespace()
                .any(|part| query.contains(&word_padded(part)))
            {
                return Ok(Some(doctor.name));
            }
        }
        Ok(None)
    }
}

fn ask_confirmation(mut state: BookingState) -> BookingState {
    state.response = if state.date.is_empty() || state.time.is_empty() {
        format!(
            "📅 When would you like to see Dr. {}? Please share a date (YYYY-MM-DD) and time (HH:MM).",
            state.doctor_name
        )
    } else if state.city.is_empty() {
        format!(
            "📌 Confirm appointment with Dr. {} on {} at {}? (yes/no)",
            state.doctor_name, state.date, state.time
        )
    } else {
        format!(
            "📌 Confirm appointment with Dr. {} on {} at {} in {}? (yes/no)",
            state.doctor_name, state.date, state.time, state.city
        )
    };
    state
}

fn cancel(mut state: BookingState) -> BookingState {
    tracing::info!("Booking declined by user");
    state.response = "❌ Appointment cancelled.".to_string();
    state.error = Some(BookingError::Cancelled);
    state
}

fn slot_taken(state: &BookingState) -> BookingError {
    BookingError::SlotTaken {
        doctor: state.doctor_name.clone(),
        date: state.date.clone(),
        time: state.time.clone(),
    }
}

/// Lowercased words joined and wrapped by single spaces, so a
/// `contains` check only matches whole words ("ent" not in "appointment").
fn word_padded(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", words.join(" "))
}

fn strip_title(name: &str) -> String {
    TITLE.replace(name.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SqliteStore;

    const SEED: &str = r#"[
        {"name": "Anil Mehta", "specialization": "cardiologist", "city": "Delhi",
         "contact": "011-555-0101", "fee": "₹500",
         "slots": [{"date": "2025-07-01", "time": "10:00"}]},
        {"name": "Kavya Rao", "specialization": "neurologist", "city": "Pune"}
    ]"#;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_doctors_json(SEED).unwrap();
        store
    }

    fn request(text: &str) -> BookingState {
        BookingState {
            date: "2025-07-01".into(),
            time: "10:00".into(),
            user_name: "Asha".into(),
            phone: "9876543210".into(),
            ..BookingState::new(text)
        }
    }

    #[test]
    fn two_step_confirmation_books_exactly_once() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);

        let first = machine.run(request("Book Dr. Mehta please"));
        assert_eq!(first.confirmed, Confirmation::Unset);
        assert!(first.error.is_none());
        assert_eq!(
            first.response,
            "📌 Confirm appointment with Dr. Anil Mehta on 2025-07-01 at 10:00? (yes/no)"
        );
        assert_eq!(store.count_appointments().unwrap(), 0);

        let second = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..first });
        assert!(second.error.is_none(), "{:?}", second.error);
        assert_eq!(second.response, "✅ Appointment booked with Dr. Anil Mehta on 2025-07-01 at 10:00.");
        assert_eq!(store.count_appointments().unwrap(), 1);

        let record = store.get_appointment(&second.booking_id.unwrap()).unwrap().unwrap();
        assert_eq!(record.status, AppointmentStatus::Pending);
        assert_eq!(record.amount.as_deref(), Some("₹500"));
        assert_eq!(record.contact.as_deref(), Some("011-555-0101"));
        assert_eq!(record.specialization, "cardiologist");
    }

    #[test]
    fn taken_slot_leaves_ledger_unchanged() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let booked = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..request("Dr Mehta") });
        assert!(booked.is_booked());

        let again = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..request("Dr Mehta") });
        assert_eq!(
            again.error,
            Some(BookingError::SlotTaken {
                doctor: "Anil Mehta".into(),
                date: "2025-07-01".into(),
                time: "10:00".into(),
            })
        );
        assert_eq!(again.response, "❌ Slot already booked with Anil Mehta on 2025-07-01 at 10:00.");
        assert_eq!(store.count_appointments().unwrap(), 1);
    }

    #[test]
    fn unpadded_slot_cannot_double_book() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let padded = BookingState { date: "2025-07-01".into(), time: "09:30".into(), ..request("Dr Mehta") };
        let booked = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..padded });
        assert!(booked.is_booked());

        let unpadded = BookingState { date: "2025-7-1".into(), time: "9:30".into(), ..request("Dr Mehta") };
        let asked = machine.run(unpadded.clone());
        assert_eq!(
            asked.error,
            Some(BookingError::SlotTaken {
                doctor: "Anil Mehta".into(),
                date: "2025-07-01".into(),
                time: "09:30".into(),
            })
        );

        let again = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..unpadded });
        assert!(matches!(again.error, Some(BookingError::SlotTaken { .. })));
        assert_eq!(store.count_appointments().unwrap(), 1);
    }

    #[test]
    fn unpadded_free_slot_is_confirmed_in_padded_form() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let asked = machine.run(BookingState { date: "2025-7-2".into(), time: "9:05".into(), ..request("Dr Mehta") });
        assert_eq!(
            asked.response,
            "📌 Confirm appointment with Dr. Anil Mehta on 2025-07-02 at 09:05? (yes/no)"
        );
    }

    /// Ledger that reports every slot free but loses every insert race.
    struct RacingLedger;

    impl SlotLedger for RacingLedger {
        fn exists(&self, _: &str, _: &str, _: &str) -> Result<bool, DatabaseError> {
            Ok(false)
        }

        fn insert(&self, _: &BookingRecord) -> Result<LedgerInsert, DatabaseError> {
            Ok(LedgerInsert::Conflict)
        }
    }

    #[test]
    fn insert_conflict_after_free_check_is_slot_taken() {
        let store = store();
        let machine = BookingMachine::new(&store, &RacingLedger);
        let state = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..request("Dr Mehta") });

        assert_eq!(
            state.error,
            Some(BookingError::SlotTaken {
                doctor: "Anil Mehta".into(),
                date: "2025-07-01".into(),
                time: "10:00".into(),
            })
        );
        assert_eq!(state.response, "❌ Slot already booked with Anil Mehta on 2025-07-01 at 10:00.");
        assert!(state.booking_id.is_none());
        assert_eq!(store.count_appointments().unwrap(), 0);
    }

    #[test]
    fn declined_booking_is_cancelled() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let state = machine.run(BookingState { confirmed: Confirmation::Declined, ..request("Dr. Rao") });
        assert_eq!(state.error, Some(BookingError::Cancelled));
        assert_eq!(state.response, "❌ Appointment cancelled.");
        assert_eq!(store.count_appointments().unwrap(), 0);
    }

    #[test]
    fn missing_doctor_short_circuits() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let state = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..request("I need an appointment") });
        assert_eq!(state.error, Some(BookingError::MissingDoctor));
        assert_eq!(state.response, "Missing doctor name.");
        assert_eq!(store.count_appointments().unwrap(), 0);
    }

    #[test]
    fn unknown_doctor_is_not_found_on_confirm() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let state = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..request("Dr. Smith") });
        assert_eq!(state.error, Some(BookingError::DoctorNotFound("Smith".into())));
    }

    #[test]
    fn malformed_date_and_time_are_rejected() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let bad_date = machine.run(BookingState { date: "01/07/2025".into(), ..request("Dr. Rao") });
        assert_eq!(bad_date.error, Some(BookingError::InvalidDate("01/07/2025".into())));

        let bad_time = machine.run(BookingState { time: "10am".into(), ..request("Dr. Rao") });
        assert_eq!(bad_time.error, Some(BookingError::InvalidTime("10am".into())));
    }

    #[test]
    fn name_part_and_specialization_found_in_text() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let state = machine.parse_doctor_and_specialization(BookingState::new(
            "can I see kavya, the neurologist, in pune",
        ));
        assert_eq!(state.doctor_name, "Kavya Rao");
        assert_eq!(state.specialization, "neurologist");
    }

    #[test]
    fn drink_is_not_a_doctor_mention() {
        assert!(DOCTOR_MENTION.captures("I drink water").is_none());
        assert_eq!(&DOCTOR_MENTION.captures("see doctor Rao").unwrap()[1], "Rao");
        assert_eq!(strip_title("Dr. Anil Mehta"), "Anil Mehta");
    }

    #[test]
    fn specialization_matches_whole_words_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .import_doctors_json(r#"[{"name": "Ravi Shankar", "specialization": "ent"}]"#)
            .unwrap();
        let machine = BookingMachine::new(&store, &store);

        let state = machine.parse_doctor_and_specialization(BookingState::new("book an appointment"));
        assert!(state.specialization.is_empty());

        let state = machine.parse_doctor_and_specialization(BookingState::new("an ENT doctor, Ravi"));
        assert_eq!(state.specialization, "ent");
        assert_eq!(state.doctor_name, "Ravi Shankar");
    }

    #[test]
    fn missing_slot_asks_for_date_and_time() {
        let store = store();
        let machine = BookingMachine::new(&store, &store);
        let asked = machine.run(BookingState::new("Dr. Rao"));
        assert!(asked.error.is_none());
        assert!(asked.response.contains("Kavya Rao"));

        let confirmed = machine.run(BookingState { confirmed: Confirmation::Confirmed, ..asked });
        assert_eq!(confirmed.error, Some(BookingError::MissingSlot));
    }
}
