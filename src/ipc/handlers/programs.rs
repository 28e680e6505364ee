use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, get_required_text, require_session, HandlerErr};
use crate::ipc::types::{AppState, Request};

fn program_exists(conn: &Connection, program_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM programs WHERE id = ?", [program_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(|e| HandlerErr::db("db_query_failed", e))
}

fn check_instructor(conn: &Connection, instructor_id: &str) -> Result<(), HandlerErr> {
    let found = conn
        .query_row(
            "SELECT 1 FROM instructors WHERE id = ?",
            [instructor_id],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .is_some();
    if !found {
        return Err(HandlerErr::not_found(format!(
            "instructor not found: {}",
            instructor_id
        )));
    }
    Ok(())
}

fn check_students(conn: &Connection, student_ids: &[String]) -> Result<(), HandlerErr> {
    for student_id in student_ids {
        let found = conn
            .query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
                r.get::<_, i64>(0)
            })
            .optional()
            .map_err(|e| HandlerErr::db("db_query_failed", e))?
            .is_some();
        if !found {
            return Err(HandlerErr::not_found(format!(
                "student not found: {}",
                student_id
            )));
        }
    }
    Ok(())
}

/// Pulls `studentIds` out of the params when present. `None` means the key
/// was absent (leave enrolments alone on update); a present key must be an
/// array of strings.
fn parse_student_ids(
    params: &serde_json::Value,
) -> Result<Option<Vec<String>>, HandlerErr> {
    let Some(raw) = params.get("studentIds") else {
        return Ok(None);
    };
    let Some(items) = raw.as_array() else {
        return Err(HandlerErr::bad_params("studentIds must be an array"));
    };
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let Some(s) = item.as_str() else {
            return Err(HandlerErr::bad_params("studentIds must contain strings"));
        };
        ids.push(s.to_string());
    }
    Ok(Some(ids))
}

fn programs_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, instructor_id, start_date, end_date
             FROM programs ORDER BY id",
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, Option<String>>(4)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let mut programs = Vec::with_capacity(rows.len());
    for (id, name, instructor_id, start_date, end_date) in rows {
        let mut stmt = conn
            .prepare(
                "SELECT student_id FROM program_students
                 WHERE program_id = ? ORDER BY student_id",
            )
            .map_err(|e| HandlerErr::db("db_query_failed", e))?;
        let student_ids = stmt
            .query_map([&id], |r| r.get::<_, String>(0))
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(|e| HandlerErr::db("db_query_failed", e))?;
        programs.push(json!({
            "id": id,
            "name": name,
            "instructorId": instructor_id,
            "studentIds": student_ids,
            "startDate": start_date,
            "endDate": end_date
        }));
    }
    Ok(json!({ "programs": programs }))
}

fn programs_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_text(params, "name")?;
    let instructor_id = params
        .get("instructorId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    if let Some(ref iid) = instructor_id {
        check_instructor(conn, iid)?;
    }
    let student_ids = parse_student_ids(params)?.unwrap_or_default();
    check_students(conn, &student_ids)?;

    let program_id = Uuid::new_v4().to_string();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    tx.execute(
        "INSERT INTO programs(id, name, instructor_id) VALUES(?, ?, ?)",
        (&program_id, &name, &instructor_id),
    )
    .map_err(|e| HandlerErr::db_table("db_insert_failed", e, "programs"))?;
    for student_id in &student_ids {
        tx.execute(
            "INSERT INTO program_students(program_id, student_id) VALUES(?, ?)",
            (&program_id, student_id),
        )
        .map_err(|e| HandlerErr::db_table("db_insert_failed", e, "program_students"))?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    Ok(json!({
        "programId": program_id,
        "name": name,
        "instructorId": instructor_id,
        "studentIds": student_ids
    }))
}

fn programs_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let program_id = get_required_str(params, "programId")?;
    let Some(patch) = params.get("patch") else {
        return Err(HandlerErr::bad_params("missing patch"));
    };
    if !program_exists(conn, &program_id)? {
        return Err(HandlerErr::not_found("program not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    if let Some(name) = patch.get("name").and_then(|v| v.as_str()) {
        if name.trim().is_empty() {
            return Err(HandlerErr::bad_params("name must not be empty"));
        }
        tx.execute(
            "UPDATE programs SET name = ? WHERE id = ?",
            (name.trim(), &program_id),
        )
        .map_err(|e| HandlerErr::db_table("db_update_failed", e, "programs"))?;
    }

    // instructorId: absent leaves it alone, null clears it, a string reassigns.
    if let Some(raw) = patch.get("instructorId") {
        let instructor_id = if raw.is_null() {
            None
        } else {
            let Some(s) = raw.as_str() else {
                return Err(HandlerErr::bad_params("instructorId must be a string or null"));
            };
            check_instructor(&tx, s)?;
            Some(s.to_string())
        };
        tx.execute(
            "UPDATE programs SET instructor_id = ? WHERE id = ?",
            (&instructor_id, &program_id),
        )
        .map_err(|e| HandlerErr::db_table("db_update_failed", e, "programs"))?;
    }

    if let Some(student_ids) = parse_student_ids(patch)? {
        check_students(&tx, &student_ids)?;
        tx.execute(
            "DELETE FROM program_students WHERE program_id = ?",
            [&program_id],
        )
        .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "program_students"))?;
        for student_id in &student_ids {
            tx.execute(
                "INSERT INTO program_students(program_id, student_id) VALUES(?, ?)",
                (&program_id, student_id),
            )
            .map_err(|e| HandlerErr::db_table("db_insert_failed", e, "program_students"))?;
        }
    }

    tx.commit()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    Ok(json!({ "ok": true }))
}

fn programs_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let program_id = get_required_str(params, "programId")?;
    if !program_exists(conn, &program_id)? {
        return Err(HandlerErr::not_found("program not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    tx.execute(
        "DELETE FROM program_students WHERE program_id = ?",
        [&program_id],
    )
    .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "program_students"))?;
    tx.execute("DELETE FROM programs WHERE id = ?", [&program_id])
        .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "programs"))?;
    tx.commit()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    Ok(json!({ "ok": true }))
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state).and_then(|session| {
        let conn = &session.conn;
        match req.method.as_str() {
            "programs.list" => programs_list(conn),
            "programs.create" => programs_create(conn, &req.params),
            "programs.update" => programs_update(conn, &req.params),
            "programs.delete" => programs_delete(conn, &req.params),
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
        "programs.list" | "programs.create" | "programs.update" | "programs.delete" => {
            Some(dispatch(state, req))
        }
        _ => None,
    }
}
