
use serde_json::json;
use test_support::{open_session, request_ok, spawn_sidecar};

fn ids(result: &serde_json::Value) -> Vec<String> {
    result
        .get("data")
        .and_then(|v| v.as_array())
        .expect("data")
        .iter()
        .map(|row| {
            row.get("id")
                .and_then(|v| v.as_str())
                .expect("id")
                .to_string()
        })
        .collect()
}

#[test]
fn list_defaults_filter_sort_paginate() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    // Defaults: no filter, id ascending, page 1 of 5.
    let page1 = request_ok(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert_eq!(page1.get("total").and_then(|v| v.as_i64()), Some(10));
    assert_eq!(page1.get("page").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(page1.get("pageSize").and_then(|v| v.as_i64()), Some(5));
    assert_eq!(ids(&page1), ["S001", "S002", "S003", "S004", "S005"]);

    let page2 = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "page": 2 }),
    );
    assert_eq!(ids(&page2), ["S006", "S007", "S008", "S009", "S010"]);

    let past_end = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "page": 4 }),
    );
    assert!(ids(&past_end).is_empty());
    assert_eq!(past_end.get("total").and_then(|v| v.as_i64()), Some(10));
}

#[test]
fn search_matches_id_or_name_case_insensitively() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let by_name = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.list",
        json!({ "search": "ALICE" }),
    );
    assert_eq!(by_name.get("total").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(ids(&by_name), ["S001"]);

    let by_id = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "search": "s01", "pageSize": 20 }),
    );
    assert_eq!(ids(&by_id), ["S010"]);

    // Total counts the filtered set, not the page.
    let filtered = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "search": "o", "pageSize": 2 }),
    );
    let total = filtered.get("total").and_then(|v| v.as_i64()).expect("total");
    assert!(total > 2, "expected more matches than one page, got {}", total);
    assert_eq!(ids(&filtered).len(), 2);
}

#[test]
fn sort_keys_cover_both_fields_and_directions() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_session(&mut stdin, &mut reader, "2026-08-06");

    let id_desc = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.list",
        json!({ "sort": "id-desc", "pageSize": 3 }),
    );
    assert_eq!(ids(&id_desc), ["S010", "S009", "S008"]);

    let name_asc = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "sort": "name-asc", "pageSize": 2 }),
    );
    assert_eq!(ids(&name_asc), ["S001", "S002"]); // Alice, Bob

    let name_desc = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "sort": "name-desc", "pageSize": 2 }),
    );
    assert_eq!(ids(&name_desc), ["S010", "S009"]); // Jane, Ian
}
