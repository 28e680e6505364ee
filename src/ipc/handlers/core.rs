use chrono::Local;
use serde_json::json;

use crate::cal::CalendarState;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{fmt_date, parse_date};
use crate::ipc::types::{AppState, Request, Session};
use crate::store;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "sessionOpen": state.session.is_some()
        }),
    )
}

/// Opens a fresh session: a new seeded in-memory store plus a month-view
/// calendar cursor on today. Re-opening discards whatever the previous
/// session held, which is the daemon analogue of a page reload.
fn handle_session_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let today = match req.params.get("today").and_then(|v| v.as_str()) {
        Some(s) => match parse_date(s, "today") {
            Ok(d) => d,
            Err(e) => return e.response(&req.id),
        },
        None => Local::now().date_naive(),
    };

    let conn = match store::open_store() {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    let counts = match store::seed_demo_data(&conn, today) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_seed_failed", format!("{e:?}"), None),
    };

    let calendar = CalendarState::new(today);
    state.session = Some(Session { conn, calendar });

    ok(
        &req.id,
        json!({
            "seeded": {
                "students": counts.students,
                "instructors": counts.instructors,
                "programs": counts.programs,
                "schedules": counts.schedules,
                "attendanceRecords": counts.attendance_records
            },
            "reference": fmt_date(calendar.reference),
            "viewMode": calendar.view
        }),
    )
}

fn handle_session_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.open" => Some(handle_session_open(state, req)),
        "session.close" => Some(handle_session_close(state, req)),
        _ => None,
    }
}
