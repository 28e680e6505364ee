
use serde_json::json;
use test_support::{open_session, request_err, request_ok, spawn_sidecar};

#[test]
fn detail_includes_address_guardian_programs_attendance() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let detail = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.get",
        json!({ "studentId": "S001" }),
    );
    assert_eq!(detail.get("name").and_then(|v| v.as_str()), Some("Alice Johnson"));
    assert_eq!(
        detail.pointer("/address/city").and_then(|v| v.as_str()),
        Some("Springfield")
    );
    assert_eq!(
        detail.pointer("/guardian/name").and_then(|v| v.as_str()),
        Some("Martha Johnson")
    );

    let programs = detail
        .get("programs")
        .and_then(|v| v.as_array())
        .expect("programs");
    assert_eq!(programs.len(), 1);
    assert_eq!(
        programs[0].get("name").and_then(|v| v.as_str()),
        Some("Mathematics 101")
    );
    assert_eq!(
        programs[0]
            .pointer("/instructor/name")
            .and_then(|v| v.as_str()),
        Some("Dr. Smith")
    );
    assert!(programs[0].get("startDate").and_then(|v| v.as_str()).is_some());

    let attendance = detail
        .get("attendance")
        .and_then(|v| v.as_array())
        .expect("attendance");
    assert_eq!(attendance.len(), 3);
    assert_eq!(
        attendance[0].get("date").and_then(|v| v.as_str()),
        Some("2026-08-01")
    );

    // Sparse roster rows surface nulls rather than vanishing.
    let sparse = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.get",
        json!({ "studentId": "S002" }),
    );
    assert!(sparse.pointer("/address/city").map(|v| v.is_null()).unwrap_or(false));
    assert!(sparse
        .get("attendance")
        .and_then(|v| v.as_array())
        .map(|a| a.is_empty())
        .unwrap_or(false));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "studentId": "S999" }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn create_update_delete_round_trip() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "name": "No Email" }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "name": "   ", "email": "x@example.com" }),
    );
    assert_eq!(code, "bad_params");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({
            "name": "Kara Novak",
            "email": "kara@example.com",
            "mobile": "+1-555-0199",
            "address": { "city": "Portland", "country": "USA" },
            "guardian": { "name": "Lena Novak", "relation": "Mother" }
        }),
    );
    let student_id = created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();

    let detail = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(detail.get("mobile").and_then(|v| v.as_str()), Some("+1-555-0199"));
    assert_eq!(
        detail.pointer("/address/city").and_then(|v| v.as_str()),
        Some("Portland")
    );
    assert_eq!(
        detail.pointer("/guardian/relation").and_then(|v| v.as_str()),
        Some("Mother")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({
            "studentId": student_id,
            "patch": {
                "name": "Kara Novak-Reyes",
                "address": { "city": "Salem" }
            }
        }),
    );
    let detail = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(
        detail.get("name").and_then(|v| v.as_str()),
        Some("Kara Novak-Reyes")
    );
    assert_eq!(
        detail.pointer("/address/city").and_then(|v| v.as_str()),
        Some("Salem")
    );
    // Untouched fields survive a partial patch.
    assert_eq!(
        detail.pointer("/address/country").and_then(|v| v.as_str()),
        Some("USA")
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "students.update",
        json!({ "studentId": student_id, "patch": { "email": "" } }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "students.update",
        json!({ "studentId": "S999", "patch": { "name": "X" } }),
    );
    assert_eq!(code, "not_found");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn delete_clears_enrolments_and_attendance() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    // S001 is enrolled in P001 and has attendance rows.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.delete",
        json!({ "studentId": "S001" }),
    );

    let programs = request_ok(&mut stdin, &mut reader, "2", "programs.list", json!({}));
    let p001 = programs
        .get("programs")
        .and_then(|v| v.as_array())
        .expect("programs")
        .iter()
        .find(|p| p.get("id").and_then(|v| v.as_str()) == Some("P001"))
        .cloned()
        .expect("P001");
    let enrolled = p001
        .get("studentIds")
        .and_then(|v| v.as_array())
        .expect("studentIds");
    assert!(!enrolled.iter().any(|v| v.as_str() == Some("S001")));

    let listed = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(listed.get("total").and_then(|v| v.as_i64()), Some(9));
}
