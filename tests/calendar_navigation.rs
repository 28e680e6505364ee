
use serde_json::json;
use test_support::{open_session, request_err, request_ok, spawn_sidecar};

#[test]
fn advance_clamps_to_shorter_months() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-01-31");

    let state = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "calendar.advance",
        json!({ "deltaMonths": 1 }),
    );
    assert_eq!(
        state.get("reference").and_then(|v| v.as_str()),
        Some("2026-02-28")
    );

    // Round trip lands in January again, on the clamped day.
    let state = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "calendar.advance",
        json!({ "deltaMonths": -1 }),
    );
    assert_eq!(
        state.get("reference").and_then(|v| v.as_str()),
        Some("2026-01-28")
    );

    // Across a year boundary in one step.
    let state = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "calendar.advance",
        json!({ "deltaMonths": -13 }),
    );
    assert_eq!(
        state.get("reference").and_then(|v| v.as_str()),
        Some("2024-12-28")
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "calendar.advance",
        json!({}),
    );
    assert_eq!(code, "bad_params");
}

#[test]
fn select_day_focuses_day_view() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let state = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "calendar.selectDay",
        json!({ "day": "2026-08-12" }),
    );
    assert_eq!(
        state.get("reference").and_then(|v| v.as_str()),
        Some("2026-08-12")
    );
    assert_eq!(state.get("viewMode").and_then(|v| v.as_str()), Some("day"));

    // Toggling back keeps the reference where the click left it.
    let state = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "calendar.setView",
        json!({ "viewMode": "month" }),
    );
    assert_eq!(
        state.get("reference").and_then(|v| v.as_str()),
        Some("2026-08-12")
    );
    assert_eq!(state.get("viewMode").and_then(|v| v.as_str()), Some("month"));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "calendar.setView",
        json!({ "viewMode": "week" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "calendar.selectDay",
        json!({ "day": "12-08-2026" }),
    );
    assert_eq!(code, "bad_params");
}
