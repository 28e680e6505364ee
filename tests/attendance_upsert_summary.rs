
use serde_json::json;
use test_support::{open_session, request_err, request_ok, spawn_sidecar};

fn status_on<'a>(summary: &'a serde_json::Value, date: &str) -> &'a serde_json::Value {
    summary
        .get("days")
        .and_then(|v| v.as_array())
        .expect("days")
        .iter()
        .find(|d| d.get("date").and_then(|v| v.as_str()) == Some(date))
        .and_then(|d| d.get("status"))
        .unwrap_or_else(|| panic!("no summary entry for {}", date))
}

fn month_summary(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
) -> serde_json::Value {
    request_ok(
        stdin,
        reader,
        id,
        "attendance.monthSummary",
        json!({ "studentId": "S001", "month": "2026-08" }),
    )
}

#[test]
fn summary_lists_every_day_of_the_month() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let summary = month_summary(&mut stdin, &mut reader, "1");
    let days = summary.get("days").and_then(|v| v.as_array()).expect("days");
    assert_eq!(days.len(), 31);
    assert_eq!(
        days[0].get("date").and_then(|v| v.as_str()),
        Some("2026-08-01")
    );
    assert_eq!(
        days[30].get("date").and_then(|v| v.as_str()),
        Some("2026-08-31")
    );

    // Seeded marks for S001: Present, Absent, Present on the 1st-3rd.
    assert_eq!(status_on(&summary, "2026-08-01").as_str(), Some("Present"));
    assert_eq!(status_on(&summary, "2026-08-02").as_str(), Some("Absent"));
    assert_eq!(status_on(&summary, "2026-08-03").as_str(), Some("Present"));
    assert!(status_on(&summary, "2026-08-04").is_null());
}

#[test]
fn recording_a_date_twice_replaces_the_record() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.record",
        json!({ "studentId": "S001", "date": "2026-08-02", "status": "Present" }),
    );
    let summary = month_summary(&mut stdin, &mut reader, "2");
    assert_eq!(status_on(&summary, "2026-08-02").as_str(), Some("Present"));

    // Lowercase input is accepted and stored canonically.
    let recorded = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.record",
        json!({ "studentId": "S001", "date": "2026-08-02", "status": "late" }),
    );
    assert_eq!(recorded.get("status").and_then(|v| v.as_str()), Some("Late"));

    let summary = month_summary(&mut stdin, &mut reader, "4");
    assert_eq!(status_on(&summary, "2026-08-02").as_str(), Some("Late"));
    let marked = summary
        .get("days")
        .and_then(|v| v.as_array())
        .expect("days")
        .iter()
        .filter(|d| d.get("status").map(|s| !s.is_null()).unwrap_or(false))
        .count();
    assert_eq!(marked, 3); // still one record per date
}

#[test]
fn bulk_record_stamps_one_day_in_a_single_call() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.bulkRecord",
        json!({
            "date": "2026-08-05",
            "records": [
                { "studentId": "S001", "status": "Present" },
                { "studentId": "S002", "status": "Absent" },
                { "studentId": "S999", "status": "Present" }
            ]
        }),
    );
    // Unknown students are skipped, not fatal.
    assert_eq!(result.get("recorded").and_then(|v| v.as_u64()), Some(2));

    let summary = month_summary(&mut stdin, &mut reader, "2");
    assert_eq!(status_on(&summary, "2026-08-05").as_str(), Some("Present"));

    let other = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.monthSummary",
        json!({ "studentId": "S002", "month": "2026-08" }),
    );
    assert_eq!(status_on(&other, "2026-08-05").as_str(), Some("Absent"));
}

#[test]
fn malformed_input_is_rejected() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.record",
        json!({ "studentId": "S999", "date": "2026-08-05", "status": "Present" }),
    );
    assert_eq!(code, "not_found");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.record",
        json!({ "studentId": "S001", "date": "2026-08-05", "status": "Tardy" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.record",
        json!({ "studentId": "S001", "date": "05-08-2026", "status": "Present" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.monthSummary",
        json!({ "studentId": "S001", "month": "2026-13" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.monthSummary",
        json!({ "studentId": "S001", "month": "August" }),
    );
    assert_eq!(code, "bad_params");
}
