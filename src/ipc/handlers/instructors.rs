use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_opt_str, get_required_str, get_required_text, require_session, HandlerErr,
};
use crate::ipc::types::{AppState, Request};

fn instructor_exists(conn: &Connection, instructor_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row(
        "SELECT 1 FROM instructors WHERE id = ?",
        [instructor_id],
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
    .map_err(|e| HandlerErr::db("db_query_failed", e))
}

fn instructors_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT id, name, email, subject FROM instructors ORDER BY id")
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let instructors = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "email": r.get::<_, String>(2)?,
                "subject": r.get::<_, String>(3)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "instructors": instructors }))
}

fn instructors_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_text(params, "name")?;
    let email = get_required_text(params, "email")?;
    let subject = get_required_text(params, "subject")?;

    let instructor_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO instructors(id, name, email, subject) VALUES(?, ?, ?, ?)",
        (&instructor_id, &name, &email, &subject),
    )
    .map_err(|e| HandlerErr::db_table("db_insert_failed", e, "instructors"))?;

    Ok(json!({ "instructorId": instructor_id, "name": name, "email": email, "subject": subject }))
}

fn instructors_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let instructor_id = get_required_str(params, "instructorId")?;
    let Some(patch) = params.get("patch") else {
        return Err(HandlerErr::bad_params("missing patch"));
    };
    if !instructor_exists(conn, &instructor_id)? {
        return Err(HandlerErr::not_found("instructor not found"));
    }

    for (key, col) in [("name", "name"), ("email", "email"), ("subject", "subject")] {
        let Some(v) = get_opt_str(patch, key) else {
            continue;
        };
        if v.trim().is_empty() {
            return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
        }
        let sql = format!("UPDATE instructors SET {} = ? WHERE id = ?", col);
        conn.execute(&sql, (&v, &instructor_id))
            .map_err(|e| HandlerErr::db_table("db_update_failed", e, "instructors"))?;
    }

    Ok(json!({ "ok": true }))
}

fn instructors_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let instructor_id = get_required_str(params, "instructorId")?;
    if !instructor_exists(conn, &instructor_id)? {
        return Err(HandlerErr::not_found("instructor not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    // Programs taught by this instructor stay, unassigned.
    tx.execute(
        "UPDATE programs SET instructor_id = NULL WHERE instructor_id = ?",
        [&instructor_id],
    )
    .map_err(|e| HandlerErr::db_table("db_update_failed", e, "programs"))?;
    tx.execute("DELETE FROM instructors WHERE id = ?", [&instructor_id])
        .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "instructors"))?;
    tx.commit()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    Ok(json!({ "ok": true }))
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state).and_then(|session| {
        let conn = &session.conn;
        match req.method.as_str() {
            "instructors.list" => instructors_list(conn),
            "instructors.create" => instructors_create(conn, &req.params),
            "instructors.update" => instructors_update(conn, &req.params),
            "instructors.delete" => instructors_delete(conn, &req.params),
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
        "instructors.list" | "instructors.create" | "instructors.update"
        | "instructors.delete" => Some(dispatch(state, req)),
        _ => None,
    }
}
