use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::{
    fmt_date, get_required_date, get_required_str, require_session, HandlerErr,
};
use crate::ipc::types::{AppState, Request};

/// Canonical status spelling; input is matched case-insensitively because
/// the marking page and the per-student view historically disagreed on
/// casing.
fn parse_status(raw: &str) -> Result<&'static str, HandlerErr> {
    match raw.to_ascii_lowercase().as_str() {
        "present" => Ok("Present"),
        "absent" => Ok("Absent"),
        "late" => Ok("Late"),
        _ => Err(HandlerErr::bad_params(
            "status must be Present, Absent or Late",
        )),
    }
}

fn parse_month_key(month: &str) -> Result<(i32, u32), HandlerErr> {
    let Some((y, m)) = month.trim().split_once('-') else {
        return Err(HandlerErr::bad_params("month must be YYYY-MM"));
    };
    let year = y
        .parse::<i32>()
        .map_err(|_| HandlerErr::bad_params("month year must be numeric"))?;
    let month_num = m
        .parse::<u32>()
        .map_err(|_| HandlerErr::bad_params("month must be YYYY-MM"))?;
    if !(1..=12).contains(&month_num) {
        return Err(HandlerErr::bad_params("month must be between 01 and 12"));
    }
    Ok((year, month_num))
}

fn student_exists(conn: &Connection, student_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(|e| HandlerErr::db("db_query_failed", e))
}

fn upsert_record(
    conn: &Connection,
    student_id: &str,
    date: &str,
    status: &str,
) -> Result<(), HandlerErr> {
    conn.execute(
        "INSERT INTO attendance(student_id, date, status)
         VALUES(?, ?, ?)
         ON CONFLICT(student_id, date) DO UPDATE SET
           status = excluded.status",
        (student_id, date, status),
    )
    .map(|_| ())
    .map_err(|e| HandlerErr::db_table("db_update_failed", e, "attendance"))
}

/// One record per (student, date): re-recording a date replaces the earlier
/// status rather than accumulating duplicates.
fn attendance_record(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let date = get_required_date(params, "date")?;
    let status = parse_status(&get_required_str(params, "status")?)?;

    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }
    upsert_record(conn, &student_id, &fmt_date(date), status)?;

    Ok(json!({ "studentId": student_id, "date": fmt_date(date), "status": status }))
}

/// The "mark all, then submit" flow: one transaction, one date, many
/// students. Unknown student ids are skipped rather than failing the batch.
fn attendance_bulk_record(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let Some(records) = params.get("records").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing records"));
    };

    let mut parsed = Vec::with_capacity(records.len());
    for record in records {
        let student_id = get_required_str(record, "studentId")?;
        let status = parse_status(&get_required_str(record, "status")?)?;
        parsed.push((student_id, status));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    let date_key = fmt_date(date);
    let mut recorded = 0usize;
    for (student_id, status) in parsed {
        if !student_exists(&tx, &student_id)? {
            continue;
        }
        upsert_record(&tx, &student_id, &date_key, status)?;
        recorded += 1;
    }
    tx.commit()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    Ok(json!({ "date": date_key, "recorded": recorded }))
}

/// Every day of the month in order, with the student's status or null.
/// Mirrors the per-student calendar, which paints days it has no record
/// for as blank.
fn attendance_month_summary(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let (year, month) = parse_month_key(&get_required_str(params, "month")?)?;

    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let mut stmt = conn
        .prepare(
            "SELECT date, status FROM attendance
             WHERE student_id = ? AND date LIKE ?
             ORDER BY date",
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let rows: Vec<(String, String)> = stmt
        .query_map((&student_id, format!("{:04}-{:02}-%", year, month)), |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| HandlerErr::bad_params("month out of range"))?;
    let mut days = Vec::new();
    let mut day = first;
    while day.month() == month {
        let key = fmt_date(day);
        let status = rows
            .iter()
            .find(|(date, _)| *date == key)
            .map(|(_, status)| json!(status))
            .unwrap_or(serde_json::Value::Null);
        days.push(json!({ "date": key, "status": status }));
        day += Duration::days(1);
    }

    Ok(json!({
        "studentId": student_id,
        "month": format!("{:04}-{:02}", year, month),
        "days": days
    }))
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state).and_then(|session| {
        let conn = &session.conn;
        match req.method.as_str() {
            "attendance.record" => attendance_record(conn, &req.params),
            "attendance.bulkRecord" => attendance_bulk_record(conn, &req.params),
            "attendance.monthSummary" => attendance_month_summary(conn, &req.params),
            other => Err(HandlerErr::new(
                "not_implemented",
                format!("unknown method: {}", other),
            )),
        }
    });
    match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.record" | "attendance.bulkRecord" | "attendance.monthSummary" => {
            Some(dispatch(state, req))
        }
        _ => None,
    }
}
