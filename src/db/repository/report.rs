use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::appointment::TIMESTAMP_FORMAT;
use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_report(conn: &Connection, report: &SymptomReport) -> Result<(), DatabaseError> {
    let symptoms = serde_json::to_string(&report.symptoms)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    conn.execute(
        "INSERT INTO symptom_reports (id, phone, user_name, session_id, symptoms, ai_suggestion,
         specialist, summary, emergency, urgency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            report.id.to_string(),
            report.phone.trim(),
            report.user_name,
            report.session_id.to_string(),
            symptoms,
            report.ai_suggestion,
            report.specialist,
            report.summary,
            report.emergency,
            report.urgency.as_str(),
            report.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Reports saved under `phone`, newest first. `limit` caps the count.
pub fn list_reports_for_phone(
    conn: &Connection,
    phone: &str,
    limit: Option<usize>,
) -> Result<Vec<SymptomReport>, DatabaseError> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let mut stmt = conn.prepare(&format!(
        "{SELECT_REPORTS} WHERE phone = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![phone.trim(), limit], report_row)?;
    report_rows_to_vec(rows)
}

pub fn get_report(conn: &Connection, id: &Uuid) -> Result<Option<SymptomReport>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_REPORTS} WHERE id = ?1"))?;
    let rows = stmt.query_map(params![id.to_string()], report_row)?;
    Ok(report_rows_to_vec(rows)?.into_iter().next())
}

pub fn delete_report(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM symptom_reports WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "SymptomReport".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

const SELECT_REPORTS: &str = "SELECT id, phone, user_name, session_id, symptoms, ai_suggestion,
    specialist, summary, emergency, urgency, created_at FROM symptom_reports";

type ReportRow = (
    String, String, Option<String>, String,
    String, String, String, String,
    bool, String, String,
);

fn report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
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
    ))
}

fn report_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<ReportRow>>,
) -> Result<Vec<SymptomReport>, DatabaseError> {
    let mut reports = Vec::new();
    for row in rows {
        let (
            id, phone, user_name, session_id, symptoms, ai_suggestion,
            specialist, summary, emergency, urgency, created_at,
        ) = row?;
        reports.push(SymptomReport {
            id: parse_uuid(&id)?,
            phone,
            user_name,
            session_id: parse_uuid(&session_id)?,
            symptoms: serde_json::from_str(&symptoms)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            ai_suggestion,
            specialist,
            summary,
            emergency,
            urgency: Urgency::from_str(&urgency)?,
            created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
                .unwrap_or_default(),
        });
    }
    Ok(reports)
}

fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
