use rusqlite::Connection;
use serde::Deserialize;

use crate::cal::CalendarState;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything one dashboard session owns: the in-memory store and the
/// calendar cursor. Dropped wholesale on session.close or re-open, which is
/// what destroys the store.
pub struct Session {
    pub conn: Connection,
    pub calendar: CalendarState,
}

pub struct AppState {
    pub session: Option<Session>,
}
