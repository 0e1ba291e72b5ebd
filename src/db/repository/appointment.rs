use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{is_constraint_violation, DatabaseError};
use crate::models::*;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Canonical `(date, time)` ledger key.
pub(crate) fn slot_key(date: &str, time: &str) -> Result<(String, String), DatabaseError> {
    match (canonical_date(date), canonical_time(time)) {
        (Some(date), Some(time)) => Ok((date, time)),
        _ => Err(DatabaseError::InvalidSlot {
            date: date.to_string(),
            time: time.to_string(),
        }),
    }
}

/// Insert a ledger row. An active booking for the same (doctor, date, time)
/// fails with `ConstraintViolation` via the partial unique index.
pub fn insert_appointment(conn: &Connection, record: &BookingRecord) -> Result<(), DatabaseError> {
    let (date, time) = slot_key(&record.date, &record.time)?;
    let result = conn.execute(
        "INSERT INTO appointments (id, user_name, phone, age, doctor_name, specialization,
         contact, amount, status, date, time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.id.to_string(),
            record.user_name,
            record.phone,
            record.age,
            record.doctor_name,
            record.specialization,
            record.contact,
            record.amount,
            record.status.as_str(),
            date,
            time,
            record.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(DatabaseError::ConstraintViolation(format!(
            "slot {} {date} {time} already booked",
            record.doctor_name
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Whether an active (non-cancelled) booking holds this slot.
pub fn slot_is_booked(
    conn: &Connection,
    doctor_name: &str,
    date: &str,
    time: &str,
) -> Result<bool, DatabaseError> {
    let (date, time) = slot_key(date, time)?;
    let booked = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM appointments
         WHERE doctor_name = ?1 AND date = ?2 AND time = ?3 AND status != 'cancelled')",
        params![doctor_name, date, time],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(booked)
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<BookingRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_APPOINTMENTS} WHERE id = ?1"))?;
    let rows = stmt.query_map(params![id.to_string()], appointment_row)?;
    Ok(appointment_rows_to_vec(rows)?.into_iter().next())
}

pub fn list_appointments_for_doctor(
    conn: &Connection,
    doctor_name: &str,
) -> Result<Vec<BookingRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_APPOINTMENTS} WHERE lower(doctor_name) = lower(?1) ORDER BY date, time"
    ))?;
    let rows = stmt.query_map(params![doctor_name], appointment_row)?;
    appointment_rows_to_vec(rows)
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    );
    match changed {
        Ok(0) => Err(not_found(id)),
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(DatabaseError::ConstraintViolation(format!(
            "cannot set appointment {id} to {status}: slot is held by another booking"
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Cancelling frees the slot for new bookings.
pub fn cancel_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    update_appointment_status(conn, id, AppointmentStatus::Cancelled)
}

pub fn reschedule_appointment(
    conn: &Connection,
    id: &Uuid,
    date: &str,
    time: &str,
) -> Result<(), DatabaseError> {
    let (date, time) = slot_key(date, time)?;
    let changed = conn.execute(
        "UPDATE appointments SET date = ?1, time = ?2 WHERE id = ?3",
        params![date, time, id.to_string()],
    );
    match changed {
        Ok(0) => Err(not_found(id)),
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(DatabaseError::ConstraintViolation(format!(
            "slot {date} {time} already booked"
        ))),
        Err(e) => Err(e.into()),
    }
}

fn not_found(id: &Uuid) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "Appointment".into(),
        id: id.to_string(),
    }
}

const SELECT_APPOINTMENTS: &str = "SELECT id, user_name, phone, age, doctor_name, specialization,
    contact, amount, status, date, time, created_at FROM appointments";

type AppointmentRow = (
    String, String, String, Option<u32>,
    String, String, Option<String>, Option<String>,
    String, String, String, String,
);

fn appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

fn appointment_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow>>,
) -> Result<Vec<BookingRecord>, DatabaseError> {
    let mut records = Vec::new();
    for row in rows {
        let (
            id, user_name, phone, age, doctor_name, specialization,
            contact, amount, status, date, time, created_at,
        ) = row?;
        records.push(BookingRecord {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            user_name,
            phone,
            age,
            doctor_name,
            specialization,
            contact,
            amount,
            status: AppointmentStatus::from_str(&status)?,
            date,
            time,
            created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
                .unwrap_or_default(),
        });
    }
    Ok(records)
}
