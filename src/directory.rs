//! Collaborator interfaces consumed by the dialogue and booking machines,
//! and their SQLite-backed implementation.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{
    AppointmentStatus, BookingRecord, DoctorRecord, OfferedSlot, SymptomReport, SLOT_DATE_FORMAT,
};

// ═══════════════════════════════════════════
// Terminology lookup
// ═══════════════════════════════════════════

/// A medical-thesaurus hit for a symptom keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionMatch {
    pub name: String,
    pub code: Option<String>,
}

/// Best-effort condition lookup. Failures are reported as no matches.
pub trait TerminologyLookup {
    fn lookup_condition(&self, keyword: &str) -> Vec<ConditionMatch>;
}

/// Lookup that never finds anything; the keyword names the condition.
pub struct NoTerminology;

impl TerminologyLookup for NoTerminology {
    fn lookup_condition(&self, _keyword: &str) -> Vec<ConditionMatch> {
        Vec::new()
    }
}

impl<F> TerminologyLookup for F
where
    F: Fn(&str) -> Vec<ConditionMatch>,
{
    fn lookup_condition(&self, keyword: &str) -> Vec<ConditionMatch> {
        self(keyword)
    }
}

// ═══════════════════════════════════════════
// Doctor directory + slot ledger
// ═══════════════════════════════════════════

pub trait DoctorDirectory {
    /// Substring match on specialization; an empty specialization matches all.
    fn find_doctors(
        &self,
        specialization: &str,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<DoctorRecord>, DatabaseError>;

    fn find_doctor_by_fuzzy_name(
        &self,
        pattern: &str,
        specialization: Option<&str>,
    ) -> Result<Option<DoctorRecord>, DatabaseError>;

    fn list_specializations(&self) -> Result<BTreeSet<String>, DatabaseError>;

    fn list_doctors(&self) -> Result<Vec<DoctorRecord>, DatabaseError>;

    fn offered_slots(&self, doctor_id: &Uuid) -> Result<Vec<OfferedSlot>, DatabaseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerInsert {
    Inserted,
    /// An active booking already holds the slot.
    Conflict,
}

/// Booked `(doctor, date, time)` slots. `insert` must refuse a second
/// active booking for the same slot even if `exists` raced.
pub trait SlotLedger {
    fn exists(&self, doctor_name: &str, date: &str, time: &str) -> Result<bool, DatabaseError>;

    fn insert(&self, record: &BookingRecord) -> Result<LedgerInsert, DatabaseError>;
}

// ═══════════════════════════════════════════
// SQLite store
// ═══════════════════════════════════════════

/// One migrated SQLite connection serving both the directory and the ledger.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Doctor entry as found in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct DoctorSeed {
    pub name: String,
    pub specialization: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(default)]
    pub slots: Vec<OfferedSlot>,
}

pub fn parse_doctor_seeds(json: &str) -> Result<Vec<DoctorSeed>, DatabaseError> {
    serde_json::from_str(json).map_err(|e| DatabaseError::InvalidSeed(e.to_string()))
}

/// Shifts every seed slot by the same number of days so the earliest one
/// lands on `first_day`. Spacing between slots is kept.
pub fn rebase_seed_slots(seeds: &mut [DoctorSeed], first_day: NaiveDate) -> Result<(), DatabaseError> {
    let mut earliest: Option<NaiveDate> = None;
    for slot in seeds.iter().flat_map(|s| &s.slots) {
        let date = NaiveDate::parse_from_str(slot.date.trim(), SLOT_DATE_FORMAT)
            .map_err(|_| DatabaseError::InvalidSeed(format!("bad slot date: {}", slot.date)))?;
        earliest = Some(earliest.map_or(date, |e| e.min(date)));
    }
    let Some(earliest) = earliest else {
        return Ok(());
    };

    let offset = first_day - earliest;
    for slot in seeds.iter_mut().flat_map(|s| s.slots.iter_mut()) {
        let shifted = NaiveDate::parse_from_str(slot.date.trim(), SLOT_DATE_FORMAT)
            .ok()
            .and_then(|date| date.checked_add_signed(offset))
            .ok_or_else(|| DatabaseError::InvalidSeed(format!("bad slot date: {}", slot.date)))?;
        slot.date = shifted.format(SLOT_DATE_FORMAT).to_string();
    }
    Ok(())
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    pub fn add_doctor(&self, doctor: &DoctorRecord, slots: &[OfferedSlot]) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        db::insert_doctor(&conn, doctor)?;
        for slot in slots {
            db::insert_offered_slot(&conn, &doctor.id, slot)?;
        }
        Ok(())
    }

    /// Load doctors from a JSON array of `DoctorSeed`. Returns how many were added.
    pub fn import_doctors_json(&self, json: &str) -> Result<usize, DatabaseError> {
        self.import_doctor_seeds(&parse_doctor_seeds(json)?)
    }

    pub fn import_doctor_seeds(&self, seeds: &[DoctorSeed]) -> Result<usize, DatabaseError> {
        for seed in seeds {
            let doctor = DoctorRecord {
                id: Uuid::new_v4(),
                name: seed.name.clone(),
                specialization: seed.specialization.clone(),
                city: seed.city.clone(),
                location: seed.location.clone(),
                contact: seed.contact.clone(),
                fee: seed.fee.clone(),
            };
            self.add_doctor(&doctor, &seed.slots)?;
        }
        tracing::info!(count = seeds.len(), "Imported doctor directory");
        Ok(seeds.len())
    }

    pub fn get_appointment(&self, id: &Uuid) -> Result<Option<BookingRecord>, DatabaseError> {
        db::get_appointment(&*self.lock()?, id)
    }

    pub fn appointments_for_doctor(&self, doctor_name: &str) -> Result<Vec<BookingRecord>, DatabaseError> {
        db::list_appointments_for_doctor(&*self.lock()?, doctor_name)
    }

    pub fn count_appointments(&self) -> Result<i64, DatabaseError> {
        db::count_appointments(&*self.lock()?)
    }

    pub fn update_status(&self, id: &Uuid, status: AppointmentStatus) -> Result<(), DatabaseError> {
        db::update_appointment_status(&*self.lock()?, id, status)
    }

    pub fn cancel(&self, id: &Uuid) -> Result<(), DatabaseError> {
        db::cancel_appointment(&*self.lock()?, id)
    }

    pub fn reschedule(&self, id: &Uuid, date: &str, time: &str) -> Result<(), DatabaseError> {
        db::reschedule_appointment(&*self.lock()?, id, date, time)
    }

    pub fn save_report(&self, report: &SymptomReport) -> Result<(), DatabaseError> {
        db::insert_report(&*self.lock()?, report)?;
        tracing::info!(report_id = %report.id, "Triage report saved");
        Ok(())
    }

    pub fn reports_for_phone(
        &self,
        phone: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SymptomReport>, DatabaseError> {
        db::list_reports_for_phone(&*self.lock()?, phone, limit)
    }

    pub fn delete_report(&self, id: &Uuid) -> Result<(), DatabaseError> {
        db::delete_report(&*self.lock()?, id)
    }
}

impl DoctorDirectory for SqliteStore {
    fn find_doctors(
        &self,
        specialization: &str,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<DoctorRecord>, DatabaseError> {
        db::find_doctors(&*self.lock()?, specialization, city, name)
    }

    fn find_doctor_by_fuzzy_name(
        &self,
        pattern: &str,
        specialization: Option<&str>,
    ) -> Result<Option<DoctorRecord>, DatabaseError> {
        db::find_doctor_by_fuzzy_name(&*self.lock()?, pattern, specialization)
    }

    fn list_specializations(&self) -> Result<BTreeSet<String>, DatabaseError> {
        db::list_specializations(&*self.lock()?)
    }

    fn list_doctors(&self) -> Result<Vec<DoctorRecord>, DatabaseError> {
        db::list_doctors(&*self.lock()?)
    }

    fn offered_slots(&self, doctor_id: &Uuid) -> Result<Vec<OfferedSlot>, DatabaseError> {
        db::get_offered_slots(&*self.lock()?, doctor_id)
    }
}

impl SlotLedger for SqliteStore {
    fn exists(&self, doctor_name: &str, date: &str, time: &str) -> Result<bool, DatabaseError> {
        db::slot_is_booked(&*self.lock()?, doctor_name, date, time)
    }

    fn insert(&self, record: &BookingRecord) -> Result<LedgerInsert, DatabaseError> {
        match db::insert_appointment(&*self.lock()?, record) {
            Ok(()) => Ok(LedgerInsert::Inserted),
            Err(DatabaseError::ConstraintViolation(reason)) => {
                tracing::warn!(%reason, "Slot insert rejected by ledger");
                Ok(LedgerInsert::Conflict)
            }
            Err(e) => Err(e),
        }
    }
}
