// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use sw_adapters::{FakeGateway, GatewayResponse};

const AGENT_TIMEOUT: Duration = Duration::from_secs(300);

fn client(gateway: &FakeGateway) -> SpawnClient<FakeGateway> {
    SpawnClient::new(gateway.clone(), SpawnConfig::default())
}

fn spawned(key: &str) -> Result<GatewayResponse, GatewayError> {
    Ok(GatewayResponse::ok(
        json!({"details": {"childSessionKey": key}}),
    ))
}

fn history(messages: Value) -> Result<GatewayResponse, GatewayError> {
    Ok(GatewayResponse::ok(json!({"details": {"messages": messages}})))
}

fn counting_heartbeat() -> (Heartbeat, Arc<AtomicU32>) {
    let beats = Arc::new(AtomicU32::new(0));
    let counter = beats.clone();
    let heartbeat = Heartbeat::detached().with_callback(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    (heartbeat, beats)
}

#[tokio::test(start_paused = true)]
async fn returns_latest_substantive_assistant_message() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-1"));
    gateway.push("sessions_history", history(json!([])));
    gateway.push(
        "sessions_history",
        history(json!([
            {"role": "user", "content": "please summarize the vault state"},
            {"role": "assistant", "content": "ok"},
            {"role": "assistant", "content": [
                {"type": "text", "text": "Processed 12 conversations"},
                {"type": "tool_use", "name": "grep"},
                {"type": "text", "text": "and extracted 4 entities."}
            ]},
            {"role": "assistant", "content": "on it"},
        ])),
    );

    let (heartbeat, beats) = counting_heartbeat();
    let output = client(&gateway)
        .spawn("summarize", "kb-curator", AGENT_TIMEOUT, &heartbeat)
        .await
        .unwrap();

    assert_eq!(
        output.output,
        "Processed 12 conversations\nand extracted 4 entities."
    );
    assert_eq!(output.session_key, "sess-1");
    assert_eq!(beats.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn spawn_request_carries_protocol_arguments() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-1"));
    gateway.push(
        "sessions_history",
        history(json!([{"role": "assistant", "content": "A complete and final answer."}])),
    );

    client(&gateway)
        .spawn("do it", "kb-curator", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap();

    let spawn = &gateway.calls_for("sessions_spawn")[0];
    assert_eq!(
        spawn.args,
        json!({
            "task": "do it",
            "agentId": "kb-curator",
            "cleanup": "delete",
            "runTimeoutSeconds": 300,
        })
    );
    assert_eq!(spawn.timeout, Duration::from_secs(360));

    let poll = &gateway.calls_for("sessions_history")[0];
    assert_eq!(
        poll.args,
        json!({"sessionKey": "sess-1", "limit": 5, "includeTools": false})
    );
    assert_eq!(poll.timeout, Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn output_is_trimmed_and_capped() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-1"));
    let long = format!("  {}  ", "y".repeat(60_000));
    gateway.push(
        "sessions_history",
        history(json!([{"role": "assistant", "content": long}])),
    );

    let output = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap();
    assert_eq!(output.output.len(), MAX_OUTPUT_CHARS);
    assert!(output.output.starts_with('y'));
}

#[tokio::test(start_paused = true)]
async fn vanished_session_counts_as_completed() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-9"));
    gateway.push("sessions_history", Ok(GatewayResponse::err("Session Not Found")));

    let output = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap();
    assert_eq!(output.output, CLEANED_UP_OUTPUT);
    assert_eq!(output.session_key, "sess-9");
}

#[tokio::test(start_paused = true)]
async fn poll_errors_wait_for_next_tick() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-1"));
    gateway.push(
        "sessions_history",
        Err(GatewayError::Transport("connection reset".into())),
    );
    gateway.push("sessions_history", Ok(GatewayResponse::err("rate limited")));
    gateway.push(
        "sessions_history",
        history(json!([{"role": "assistant", "content": "Finished all the work you asked for."}])),
    );

    let output = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap();
    assert_eq!(output.output, "Finished all the work you asked for.");
    assert_eq!(gateway.calls_for("sessions_history").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn times_out_with_session_key() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-slow"));

    let (heartbeat, beats) = counting_heartbeat();
    let err = client(&gateway)
        .spawn("t", "a", Duration::from_secs(60), &heartbeat)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Timed out after 60s");
    assert_eq!(err.session_key(), Some("sess-slow"));
    assert_eq!(gateway.calls_for("sessions_history").len(), 4);
    assert_eq!(beats.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn inline_summary_skips_polling() {
    let gateway = FakeGateway::new();
    gateway.push(
        "sessions_spawn",
        Ok(GatewayResponse::ok(
            json!({"details": {"summary": "Already done."}}),
        )),
    );

    let output = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap();
    assert_eq!(output.output, "Already done.");
    assert_eq!(output.session_key, INLINE_SESSION_KEY);
    assert!(gateway.calls_for("sessions_history").is_empty());
}

#[tokio::test]
async fn missing_session_key_is_rejected() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", Ok(GatewayResponse::ok(json!({"details": {}}))));

    let err = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ActivityError::rejected("No childSessionKey in spawn response")
    );
}

#[tokio::test]
async fn gateway_refusal_is_rejected() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", Ok(GatewayResponse::err("agent busy")));

    let err = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Spawn failed: agent busy");
}

#[tokio::test]
async fn refusal_without_error_text_says_unknown() {
    let gateway = FakeGateway::new();
    gateway.push(
        "sessions_spawn",
        Ok(GatewayResponse {
            ok: false,
            result: Value::Null,
            error: None,
        }),
    );

    let err = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Spawn failed: unknown");
}

#[tokio::test]
async fn transport_failure_on_submit() {
    let gateway = FakeGateway::new();
    gateway.push(
        "sessions_spawn",
        Err(GatewayError::Transport("connection refused".into())),
    );

    let err = client(&gateway)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::Transport(_)));
    assert!(err.to_string().starts_with("Spawn request failed: "));
}

#[tokio::test]
async fn submit_returns_session_without_polling() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-42"));

    let delegation = client(&gateway)
        .submit(
            "PLANE TASK: fix",
            "alfred",
            Duration::from_secs(600),
            &Heartbeat::detached(),
        )
        .await
        .unwrap();
    assert_eq!(delegation.session_key, "sess-42");
    assert!(gateway.calls_for("sessions_history").is_empty());
}

#[test]
fn min_length_detector_needs_more_than_twenty_chars() {
    let detector = MinLengthDetector::default();
    assert!(!detector.is_final(&"x".repeat(20)));
    assert!(detector.is_final(&"x".repeat(21)));
}

struct KeywordDetector;

impl TerminalDetector for KeywordDetector {
    fn is_final(&self, text: &str) -> bool {
        text.contains("DONE")
    }
}

#[tokio::test(start_paused = true)]
async fn custom_detector_decides_completion() {
    let gateway = FakeGateway::new();
    gateway.push("sessions_spawn", spawned("sess-1"));
    gateway.push(
        "sessions_history",
        history(json!([{"role": "assistant", "content": "Still working through the backlog..."}])),
    );
    gateway.push(
        "sessions_history",
        history(json!([{"role": "assistant", "content": "DONE"}])),
    );

    let output = client(&gateway)
        .with_detector(KeywordDetector)
        .spawn("t", "a", AGENT_TIMEOUT, &Heartbeat::detached())
        .await
        .unwrap();
    assert_eq!(output.output, "DONE");
}
