use std::collections::BTreeSet;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str = "id, name, specialization, city, location, contact, fee";

pub fn insert_doctor(conn: &Connection, doctor: &DoctorRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, name, specialization, city, location, contact, fee)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.id.to_string(),
            doctor.name,
            doctor.specialization,
            doctor.city,
            doctor.location,
            doctor.contact,
            doctor.fee,
        ],
    )?;
    Ok(())
}

pub fn insert_offered_slot(
    conn: &Connection,
    doctor_id: &Uuid,
    slot: &OfferedSlot,
) -> Result<(), DatabaseError> {
    let (date, time) = super::appointment::slot_key(&slot.date, &slot.time)?;
    conn.execute(
        "INSERT OR IGNORE INTO doctor_slots (doctor_id, date, time) VALUES (?1, ?2, ?3)",
        params![doctor_id.to_string(), date, time],
    )?;
    Ok(())
}

/// Escapes LIKE wildcards so user text matches literally (pairs with `ESCAPE '\'`).
fn like_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring search. An empty specialization matches every doctor.
pub fn find_doctors(
    conn: &Connection,
    specialization: &str,
    city: Option<&str>,
    name: Option<&str>,
) -> Result<Vec<DoctorRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors
         WHERE (?1 = '' OR lower(specialization) LIKE '%' || lower(?1) || '%' ESCAPE '\\')
           AND (?2 IS NULL OR lower(city) LIKE '%' || lower(?2) || '%' ESCAPE '\\')
           AND (?3 IS NULL OR lower(name) LIKE '%' || lower(?3) || '%' ESCAPE '\\')
         ORDER BY name"
    ))?;
    let rows = stmt.query_map(
        params![
            like_literal(specialization),
            city.map(like_literal),
            name.map(like_literal)
        ],
        row_to_doctor,
    )?;
    collect_doctors(rows)
}

/// First doctor whose name contains `pattern` (and whose specialization
/// contains `specialization`, when given).
pub fn find_doctor_by_fuzzy_name(
    conn: &Connection,
    pattern: &str,
    specialization: Option<&str>,
) -> Result<Option<DoctorRecord>, DatabaseError> {
    let specialization = specialization.map(str::trim).filter(|s| !s.is_empty());
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors
         WHERE lower(name) LIKE '%' || lower(?1) || '%' ESCAPE '\\'
           AND (?2 IS NULL OR lower(specialization) LIKE '%' || lower(?2) || '%' ESCAPE '\\')
         ORDER BY name LIMIT 1"
    ))?;
    let mut rows = stmt.query_map(
        params![like_literal(pattern), specialization.map(like_literal)],
        row_to_doctor,
    )?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<DoctorRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY name"))?;
    let rows = stmt.query_map([], row_to_doctor)?;
    collect_doctors(rows)
}

pub fn list_specializations(conn: &Connection) -> Result<BTreeSet<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT DISTINCT specialization FROM doctors")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut specializations = BTreeSet::new();
    for row in rows {
        specializations.insert(row?);
    }
    Ok(specializations)
}

pub fn get_offered_slots(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<OfferedSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT date, time FROM doctor_slots WHERE doctor_id = ?1 ORDER BY date, time",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], |row| {
        Ok(OfferedSlot {
            date: row.get(0)?,
            time: row.get(1)?,
        })
    })?;
    let mut slots = Vec::new();
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

fn row_to_doctor(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoctorRecord> {
    Ok(DoctorRecord {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        name: row.get(1)?,
        specialization: row.get(2)?,
        city: row.get(3)?,
        location: row.get(4)?,
        contact: row.get(5)?,
        fee: row.get(6)?,
    })
}

fn collect_doctors(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<DoctorRecord>>,
) -> Result<Vec<DoctorRecord>, DatabaseError> {
    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(row?);
    }
    Ok(doctors)
}
