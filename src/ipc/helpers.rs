use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use super::error::err;
use super::types::{AppState, Session};

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const TS_FMT: &str = "%Y-%m-%dT%H:%M:%S";

/// Handler-internal error carried up to the response boundary. Handlers
/// build these and convert exactly once via `response`.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn db(code: &'static str, e: rusqlite::Error) -> Self {
        Self::new(code, e.to_string())
    }

    pub fn db_table(code: &'static str, e: rusqlite::Error, table: &str) -> Self {
        Self {
            code,
            message: e.to_string(),
            details: Some(json!({ "table": table })),
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn require_session(state: &mut AppState) -> Result<&mut Session, HandlerErr> {
    state
        .session
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_session", "open a session first"))
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Required, and must be non-empty after trimming.
pub fn get_required_text(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = get_required_str(params, key)?;
    let t = v.trim().to_string();
    if t.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(t)
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn parse_date(s: &str, what: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", what)))
}

pub fn parse_ts(s: &str, what: &str) -> Result<NaiveDateTime, HandlerErr> {
    NaiveDateTime::parse_from_str(s, TS_FMT)
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DDTHH:MM:SS", what)))
}

pub fn get_required_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    parse_date(&get_required_str(params, key)?, key)
}

pub fn get_required_ts(
    params: &serde_json::Value,
    key: &str,
) -> Result<NaiveDateTime, HandlerErr> {
    parse_ts(&get_required_str(params, key)?, key)
}

pub fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

pub fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FMT).to_string()
}

/// Stored timestamps are written by us; a parse failure here means the
/// store is corrupt, not that the caller erred.
pub fn stored_ts(s: &str) -> Result<NaiveDateTime, HandlerErr> {
    NaiveDateTime::parse_from_str(s, TS_FMT)
        .map_err(|_| HandlerErr::new("db_query_failed", format!("malformed timestamp in store: {}", s)))
}
