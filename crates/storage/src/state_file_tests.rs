// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn missing_file_loads_empty_object() {
    let dir = tempfile::tempdir().unwrap();
    let value = StateStore::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(value, json!({}));
}

#[test]
fn save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/plane-polling.json");
    let data = json!({
        "last_poll": "2026-01-05T05:00:00+01:00",
        "known_todo_ids": ["t1", "t2"],
    });

    StateStore::save(&path, &data).unwrap();
    assert_eq!(StateStore::load(&path).unwrap(), data);
}

#[test]
fn save_writes_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    StateStore::save(&path, &json!({"a": 1})).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "{\n  \"a\": 1\n}\n");
    assert!(!dir.path().join("state.json.tmp").exists());
}

#[test]
fn save_replaces_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    StateStore::save(&path, &json!({"delegated_tasks": [1, 2, 3]})).unwrap();
    StateStore::save(&path, &json!({"delegated_tasks": []})).unwrap();

    assert_eq!(
        StateStore::load(&path).unwrap(),
        json!({"delegated_tasks": []})
    );
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(matches!(
        StateStore::load(&path),
        Err(StateFileError::Json { .. })
    ));
}
