//! Row-level operations for the report ledger.
//!
//! The ledger is append-only from the core's point of view: rows only
//! disappear when the account graph purge removes everything a deleted
//! account owns.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Report;

/// Append a report row.
pub fn insert_report(conn: &Connection, report: &Report) -> Result<()> {
    conn.execute(
        "INSERT INTO reports (id, reporter, reported, origin_addr, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            report.id.to_string(),
            report.reporter.to_string(),
            report.reported.to_string(),
            report.origin_addr,
            report.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Whether the origin address has already filed against this target,
/// regardless of which account did the filing.
pub fn origin_already_reported(conn: &Connection, reported: Uuid, origin_addr: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM reports WHERE reported = ?1 AND origin_addr = ?2",
            params![reported.to_string(), origin_addr],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Whether this reporter has already filed against this target.
pub fn reporter_already_reported(conn: &Connection, reported: Uuid, reporter: Uuid) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM reports WHERE reported = ?1 AND reporter = ?2",
            params![reported.to_string(), reporter.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// The authoritative escalation metric: how many distinct origin addresses
/// have reported this target.
pub fn distinct_origin_count(conn: &Connection, reported: Uuid) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(DISTINCT origin_addr) FROM reports WHERE reported = ?1",
        params![reported.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Reports filed against a target, oldest first.
pub fn list_reports_against(conn: &Connection, reported: Uuid) -> Result<Vec<Report>> {
    let mut stmt = conn.prepare(
        "SELECT id, reporter, reported, origin_addr, created_at
         FROM reports WHERE reported = ?1
         ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![reported.to_string()], row_to_report)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(row?);
    }
    Ok(reports)
}

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    let id_str: String = row.get(0)?;
    let reporter_str: String = row.get(1)?;
    let reported_str: String = row.get(2)?;
    let origin_addr: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let reporter = Uuid::parse_str(&reporter_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let reported = Uuid::parse_str(&reported_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Report {
        id,
        reporter,
        reported,
        origin_addr,
        created_at,
    })
}
