use chrono::{Datelike, Local};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::cal::{self, CalendarState, Event, ViewMode};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    fmt_date, fmt_ts, get_opt_str, get_required_str, get_required_text, get_required_ts,
    parse_date, parse_ts, require_session, stored_ts, HandlerErr,
};
use crate::ipc::types::{AppState, Request, Session};

fn load_events(conn: &Connection) -> Result<Vec<Event>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, start_at, end_at, time_label
             FROM schedules ORDER BY start_at, id",
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let mut events = Vec::with_capacity(rows.len());
    for (id, title, start_at, end_at, time_label) in rows {
        events.push(Event {
            id,
            title,
            start: stored_ts(&start_at)?,
            end: stored_ts(&end_at)?,
            time_label,
        });
    }
    Ok(events)
}

fn state_json(state: &CalendarState) -> serde_json::Value {
    json!({
        "reference": fmt_date(state.reference),
        "viewMode": state.view
    })
}

fn schedules_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let events = load_events(conn)?;
    let schedules: Vec<serde_json::Value> = events
        .iter()
        .map(|e| {
            json!({
                "id": e.id,
                "title": e.title,
                "start": fmt_ts(e.start),
                "end": fmt_ts(e.end),
                "timeLabel": e.time_label
            })
        })
        .collect();
    Ok(json!({ "schedules": schedules }))
}

fn schedules_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let title = get_required_text(params, "title")?;
    let start = get_required_ts(params, "start")?;
    let end = get_required_ts(params, "end")?;
    if end < start {
        return Err(HandlerErr::bad_params("end must not precede start"));
    }
    let time_label = get_opt_str(params, "timeLabel");

    let schedule_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO schedules(id, title, start_at, end_at, time_label)
         VALUES(?, ?, ?, ?, ?)",
        (&schedule_id, &title, fmt_ts(start), fmt_ts(end), &time_label),
    )
    .map_err(|e| HandlerErr::db_table("db_insert_failed", e, "schedules"))?;

    Ok(json!({
        "scheduleId": schedule_id,
        "title": title,
        "start": fmt_ts(start),
        "end": fmt_ts(end),
        "timeLabel": time_label
    }))
}

fn schedules_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let schedule_id = get_required_str(params, "scheduleId")?;
    let exists = conn
        .query_row("SELECT 1 FROM schedules WHERE id = ?", [&schedule_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .is_some();
    if !exists {
        return Err(HandlerErr::not_found("schedule not found"));
    }
    conn.execute("DELETE FROM schedules WHERE id = ?", [&schedule_id])
        .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "schedules"))?;
    Ok(json!({ "ok": true }))
}

fn calendar_state(session: &Session) -> Result<serde_json::Value, HandlerErr> {
    Ok(state_json(&session.calendar))
}

/// The month grid: every cell of the Sunday-start week grid covering the
/// reference month, with the events touching each day. An explicit
/// `reference` also moves the cursor, mirroring the dashboard re-rendering
/// the grid it navigated to.
fn calendar_month_grid(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    if let Some(s) = get_opt_str(params, "reference") {
        session.calendar.reference = parse_date(&s, "reference")?;
    }
    let today = match get_opt_str(params, "today") {
        Some(s) => parse_date(&s, "today")?,
        None => Local::now().date_naive(),
    };

    let events = load_events(&session.conn)?;
    let reference = session.calendar.reference;
    let days: Vec<serde_json::Value> = cal::visible_days(reference)
        .into_iter()
        .map(|day| {
            let on_day: Vec<serde_json::Value> = cal::events_on_day(&events, day)
                .into_iter()
                .map(|e| {
                    json!({
                        "id": e.id,
                        "title": e.title,
                        "timeLabel": e.time_label
                    })
                })
                .collect();
            json!({
                "date": fmt_date(day),
                "inMonth": day.month() == reference.month() && day.year() == reference.year(),
                "isToday": day == today,
                "events": on_day
            })
        })
        .collect();

    let mut result = state_json(&session.calendar);
    result["days"] = json!(days);
    Ok(result)
}

fn calendar_advance(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let delta = params
        .get("deltaMonths")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing deltaMonths"))?;
    if delta.abs() > 1200 {
        return Err(HandlerErr::bad_params("deltaMonths out of range"));
    }
    session.calendar.reference = cal::advance(session.calendar.reference, delta as i32);
    Ok(state_json(&session.calendar))
}

fn calendar_select_day(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let day = parse_date(&get_required_str(params, "day")?, "day")?;
    session.calendar = cal::select_day(session.calendar, day);
    Ok(state_json(&session.calendar))
}

fn calendar_set_view(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "viewMode")?;
    let view = match raw.as_str() {
        "month" => ViewMode::Month,
        "day" => ViewMode::Day,
        _ => return Err(HandlerErr::bad_params("viewMode must be month or day")),
    };
    session.calendar = cal::set_view(session.calendar, view);
    Ok(state_json(&session.calendar))
}

/// The 24-hour timeline for the cursor's day: each event with its minute
/// offsets and phase, plus which event is next. `now` is a parameter so the
/// UI's minute tick (and the tests) can pin the clock; the daemon itself
/// holds no timer.
fn calendar_day_view(
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let now = match get_opt_str(params, "now") {
        Some(s) => parse_ts(&s, "now")?,
        None => Local::now().naive_local(),
    };

    let events = load_events(&session.conn)?;
    let day = session.calendar.reference;
    let on_day = cal::events_on_day(&events, day);
    let next_id = cal::next_event(&on_day, now).map(|e| e.id.clone());

    let entries: Vec<serde_json::Value> = on_day
        .iter()
        .map(|&e| {
            let slot = cal::layout(e, day);
            let phase = cal::classify(e, now, next_id.as_deref());
            json!({
                "id": e.id,
                "title": e.title,
                "timeLabel": e.time_label,
                "slot": slot,
                "phase": phase
            })
        })
        .collect();

    Ok(json!({
        "reference": fmt_date(day),
        "now": fmt_ts(now),
        "nextEventId": next_id,
        "events": entries
    }))
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state).and_then(|session| match req.method.as_str() {
        "schedules.list" => schedules_list(&session.conn),
        "schedules.create" => schedules_create(&session.conn, &req.params),
        "schedules.delete" => schedules_delete(&session.conn, &req.params),
        "calendar.state" => calendar_state(session),
        "calendar.monthGrid" => calendar_month_grid(session, &req.params),
        "calendar.advance" => calendar_advance(session, &req.params),
        "calendar.selectDay" => calendar_select_day(session, &req.params),
        "calendar.setView" => calendar_set_view(session, &req.params),
        "calendar.dayView" => calendar_day_view(session, &req.params),
        other => Err(HandlerErr::new(
            "not_implemented",
            format!("unknown method: {}", other),
        )),
    });
    match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedules.list" | "schedules.create" | "schedules.delete" | "calendar.state"
        | "calendar.monthGrid" | "calendar.advance" | "calendar.selectDay"
        | "calendar.setView" | "calendar.dayView" => Some(dispatch(state, req)),
        _ => None,
    }
}
