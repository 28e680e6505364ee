use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_opt_str, get_required_str, get_required_text, require_session, HandlerErr,
};
use crate::ipc::types::{AppState, Request};

/// Scalar patch/create fields: JSON key on the wire, column in the store.
const SCALAR_FIELDS: [(&str, &str); 8] = [
    ("name", "name"),
    ("email", "email"),
    ("mobile", "mobile"),
    ("dob", "birth_date"),
    ("gender", "gender"),
    ("bloodGroup", "blood_group"),
    ("nationality", "nationality"),
    ("joiningDate", "joining_date"),
];

const ADDRESS_FIELDS: [(&str, &str); 6] = [
    ("line1", "address_line1"),
    ("line2", "address_line2"),
    ("city", "city"),
    ("state", "state"),
    ("pincode", "pincode"),
    ("country", "country"),
];

const GUARDIAN_FIELDS: [(&str, &str); 4] = [
    ("name", "guardian_name"),
    ("relation", "guardian_relation"),
    ("contact", "guardian_contact"),
    ("email", "guardian_email"),
];

fn student_exists(conn: &Connection, student_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(|e| HandlerErr::db("db_query_failed", e))
}

fn students_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let search = get_opt_str(params, "search").unwrap_or_default().to_lowercase();
    let sort = get_opt_str(params, "sort").unwrap_or_else(|| "id-asc".to_string());
    let page = params.get("page").and_then(|v| v.as_u64()).unwrap_or(1).max(1);
    let page_size = params
        .get("pageSize")
        .and_then(|v| v.as_u64())
        .unwrap_or(5)
        .max(1);

    // Unknown sort keys fall back to insertion order, as the dashboard did.
    let order_by = match sort.as_str() {
        "id-asc" => "id ASC",
        "id-desc" => "id DESC",
        "name-asc" => "name ASC",
        "name-desc" => "name DESC",
        _ => "rowid ASC",
    };

    let like = format!("%{}%", search);
    let total: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM students WHERE lower(id) LIKE ?1 OR lower(name) LIKE ?1",
            [&like],
            |r| r.get(0),
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let sql = format!(
        "SELECT id, name, email FROM students
         WHERE lower(id) LIKE ?1 OR lower(name) LIKE ?1
         ORDER BY {} LIMIT ?2 OFFSET ?3",
        order_by
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let data = stmt
        .query_map(
            (&like, page_size as i64, ((page - 1) * page_size) as i64),
            |r| {
                Ok(json!({
                    "id": r.get::<_, String>(0)?,
                    "name": r.get::<_, String>(1)?,
                    "email": r.get::<_, String>(2)?
                }))
            },
        )
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    Ok(json!({
        "data": data,
        "total": total,
        "page": page,
        "pageSize": page_size
    }))
}

fn students_get(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;

    let row = conn
        .query_row(
            "SELECT name, email, mobile, birth_date, gender, blood_group, nationality,
                    joining_date, address_line1, address_line2, city, state, pincode,
                    country, guardian_name, guardian_relation, guardian_contact,
                    guardian_email
             FROM students WHERE id = ?",
            [&student_id],
            |r| {
                let mut cols: Vec<Option<String>> = Vec::with_capacity(18);
                for i in 0..18 {
                    cols.push(r.get(i)?);
                }
                Ok(cols)
            },
        )
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let Some(cols) = row else {
        return Err(HandlerErr::not_found("student not found"));
    };

    let mut stmt = conn
        .prepare(
            "SELECT p.id, p.name, p.instructor_id, i.name, p.start_date, p.end_date
             FROM program_students ps
             JOIN programs p ON p.id = ps.program_id
             LEFT JOIN instructors i ON i.id = p.instructor_id
             WHERE ps.student_id = ?
             ORDER BY p.id",
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let programs = stmt
        .query_map([&student_id], |r| {
            let instructor_id: Option<String> = r.get(2)?;
            let instructor_name: Option<String> = r.get(3)?;
            let instructor = match (instructor_id, instructor_name) {
                (Some(id), Some(name)) => json!({ "id": id, "name": name }),
                _ => serde_json::Value::Null,
            };
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "instructor": instructor,
                "startDate": r.get::<_, Option<String>>(4)?,
                "endDate": r.get::<_, Option<String>>(5)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let mut stmt = conn
        .prepare("SELECT date, status FROM attendance WHERE student_id = ? ORDER BY date")
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let attendance = stmt
        .query_map([&student_id], |r| {
            Ok(json!({
                "date": r.get::<_, String>(0)?,
                "status": r.get::<_, String>(1)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    Ok(json!({
        "id": student_id,
        "name": cols[0],
        "email": cols[1],
        "mobile": cols[2],
        "dob": cols[3],
        "gender": cols[4],
        "bloodGroup": cols[5],
        "nationality": cols[6],
        "joiningDate": cols[7],
        "address": {
            "line1": cols[8],
            "line2": cols[9],
            "city": cols[10],
            "state": cols[11],
            "pincode": cols[12],
            "country": cols[13]
        },
        "guardian": {
            "name": cols[14],
            "relation": cols[15],
            "contact": cols[16],
            "email": cols[17]
        },
        "programs": programs,
        "attendance": attendance
    }))
}

fn students_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_text(params, "name")?;
    let email = get_required_text(params, "email")?;

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, name, email) VALUES(?, ?, ?)",
        (&student_id, &name, &email),
    )
    .map_err(|e| HandlerErr::db_table("db_insert_failed", e, "students"))?;

    let empty = json!({});
    let address = params.get("address").unwrap_or(&empty);
    let guardian = params.get("guardian").unwrap_or(&empty);
    for (key, col) in SCALAR_FIELDS.iter().skip(2).copied() {
        if let Some(v) = get_opt_str(params, key) {
            set_column(conn, &student_id, col, &v)?;
        }
    }
    for (key, col) in ADDRESS_FIELDS {
        if let Some(v) = get_opt_str(address, key) {
            set_column(conn, &student_id, col, &v)?;
        }
    }
    for (key, col) in GUARDIAN_FIELDS {
        if let Some(v) = get_opt_str(guardian, key) {
            set_column(conn, &student_id, col, &v)?;
        }
    }

    Ok(json!({ "studentId": student_id, "name": name, "email": email }))
}

fn set_column(
    conn: &Connection,
    student_id: &str,
    col: &str,
    value: &str,
) -> Result<(), HandlerErr> {
    // `col` comes from the fixed field tables above, never from the caller.
    let sql = format!("UPDATE students SET {} = ? WHERE id = ?", col);
    conn.execute(&sql, (value, student_id))
        .map(|_| ())
        .map_err(|e| HandlerErr::db_table("db_update_failed", e, "students"))
}

fn students_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let Some(patch) = params.get("patch") else {
        return Err(HandlerErr::bad_params("missing patch"));
    };

    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }
    for key in ["name", "email"] {
        if let Some(v) = get_opt_str(patch, key) {
            if v.trim().is_empty() {
                return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
            }
        }
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    let empty = json!({});
    let address = patch.get("address").unwrap_or(&empty);
    let guardian = patch.get("guardian").unwrap_or(&empty);
    for (key, col) in SCALAR_FIELDS {
        if let Some(v) = get_opt_str(patch, key) {
            set_column(&tx, &student_id, col, &v)?;
        }
    }
    for (key, col) in ADDRESS_FIELDS {
        if let Some(v) = get_opt_str(address, key) {
            set_column(&tx, &student_id, col, &v)?;
        }
    }
    for (key, col) in GUARDIAN_FIELDS {
        if let Some(v) = get_opt_str(guardian, key) {
            set_column(&tx, &student_id, col, &v)?;
        }
    }
    tx.commit()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    Ok(json!({ "ok": true }))
}

fn students_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    // Dependency order; the schema has no ON DELETE CASCADE.
    tx.execute("DELETE FROM attendance WHERE student_id = ?", [&student_id])
        .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "attendance"))?;
    tx.execute(
        "DELETE FROM program_students WHERE student_id = ?",
        [&student_id],
    )
    .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "program_students"))?;
    tx.execute("DELETE FROM students WHERE id = ?", [&student_id])
        .map_err(|e| HandlerErr::db_table("db_delete_failed", e, "students"))?;
    tx.commit()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    Ok(json!({ "ok": true }))
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state).and_then(|session| {
        let conn = &session.conn;
        match req.method.as_str() {
            "students.list" => students_list(conn, &req.params),
            "students.get" => students_get(conn, &req.params),
            "students.create" => students_create(conn, &req.params),
            "students.update" => students_update(conn, &req.params),
            "students.delete" => students_delete(conn, &req.params),
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
        "students.list" | "students.get" | "students.create" | "students.update"
        | "students.delete" => Some(dispatch(state, req)),
        _ => None,
    }
}
