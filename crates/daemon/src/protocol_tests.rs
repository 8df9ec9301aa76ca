// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use chrono::TimeZone;
use serde_json::json;

#[test]
fn trigger_request_wire_shape() {
    let request = Request::Trigger {
        workflow: "weekly-goals".to_string(),
        input: json!({"focus": "ship"}),
    };

    let encoded = encode(&request).expect("encode failed");
    let value: Value = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(
        value,
        json!({"type": "Trigger", "workflow": "weekly-goals", "input": {"focus": "ship"}})
    );

    let decoded: Request = decode(&encoded).expect("decode failed");
    assert_eq!(request, decoded);
}

#[test]
fn trigger_input_defaults_to_null() {
    let decoded: Request = decode(br#"{"type": "Trigger", "workflow": "daily-briefing"}"#).unwrap();
    assert_eq!(
        decoded,
        Request::Trigger {
            workflow: "daily-briefing".to_string(),
            input: Value::Null,
        }
    );
}

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Pong;
    let encoded = encode(&response).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert_eq!(json_str, r#"{"type":"Pong"}"#);
}

#[test]
fn run_summary_keeps_timestamps() {
    let summary = RunSummary {
        run_id: "0b6c".to_string(),
        workflow_id: "plane-polling".to_string(),
        workflow: "plane-polling".to_string(),
        status: "failed".to_string(),
        started_at: Utc.with_ymd_and_hms(2026, 1, 5, 0, 15, 0).unwrap(),
        finished_at: Some(Utc.with_ymd_and_hms(2026, 1, 5, 0, 15, 4).unwrap()),
        detail: Some("Failed to fetch tasks from Plane".to_string()),
    };
    let response = Response::Runs {
        runs: vec![summary.clone()],
    };

    let decoded: Response = decode(&encode(&response).unwrap()).unwrap();

    match decoded {
        Response::Runs { runs } => assert_eq!(runs, vec![summary]),
        other => panic!("expected Runs, got {other:?}"),
    }
}

#[test]
fn unknown_request_type_is_rejected() {
    let result: Result<Request, _> = decode(br#"{"type": "Event"}"#);
    assert!(matches!(result, Err(ProtocolError::Json(_))));
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data)
        .await
        .expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);

    let mut cursor = std::io::Cursor::new(buffer);
    assert_eq!(read_message(&mut cursor).await.unwrap(), data);
}

#[tokio::test]
async fn empty_stream_is_a_closed_connection() {
    let mut cursor = std::io::Cursor::new(Vec::new());
    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn oversized_prefix_is_refused() {
    let prefix = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
    let mut cursor = std::io::Cursor::new(prefix.to_vec());
    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::MessageTooLarge { .. })
    ));
}

#[tokio::test]
async fn request_round_trips_through_a_stream() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    let data = encode(&Request::ListRuns).unwrap();
    write_message(&mut client, &data).await.unwrap();

    let request = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(request, Request::ListRuns);
}

#[tokio::test(start_paused = true)]
async fn silent_client_times_out() {
    let (_client, mut server) = tokio::io::duplex(1024);

    let result = read_request(&mut server, Duration::from_secs(1)).await;

    assert!(matches!(result, Err(ProtocolError::Timeout)));
}
