// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use std::sync::Arc;

fn prompt() -> ApprovalPrompt {
    ApprovalPrompt {
        session_id: SessionId::new("s1"),
        tool_name: "shell.run".to_string(),
        input: serde_json::json!({"cmd": "ls"}),
        tool_use_id: "tu1".to_string(),
        description: "Run a command".to_string(),
        target_client_id: Some(ClientId::new("m1")),
    }
}

fn request_id_of(frame: &DaemonFrame) -> RequestId {
    match frame {
        DaemonFrame::ApprovalRequest { request_id, .. } => request_id.clone(),
        other => panic!("expected ApprovalRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn approved_response_resolves_request() {
    let table = Arc::new(ApprovalTable::new(Duration::from_secs(30)));
    let (uplink_tx, mut uplink_rx) = mpsc::channel(8);

    let worker = {
        let table = Arc::clone(&table);
        tokio::spawn(async move { table.request(&uplink_tx, prompt()).await })
    };

    let frame = uplink_rx.recv().await.unwrap();
    let request_id = request_id_of(&frame);
    assert!(table.resolve(&request_id, Decision { approved: true, reason: None }));

    let outcome = worker.await.unwrap();
    assert_eq!(outcome, ApprovalOutcome::Decided(Decision { approved: true, reason: None }));
    assert_eq!(table.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_fires_timeout_frame() {
    let table = Arc::new(ApprovalTable::new(Duration::from_secs(30)));
    let (uplink_tx, mut uplink_rx) = mpsc::channel(8);

    let worker = {
        let table = Arc::clone(&table);
        tokio::spawn(async move { table.request(&uplink_tx, prompt()).await })
    };

    let request_frame = uplink_rx.recv().await.unwrap();
    let request_id = request_id_of(&request_frame);

    // No response arrives; virtual time runs past the deadline.
    let outcome = worker.await.unwrap();
    assert_eq!(outcome, ApprovalOutcome::TimedOut);

    match uplink_rx.recv().await.unwrap() {
        DaemonFrame::ApprovalTimeout { request_id: timed_out, .. } => {
            assert_eq!(timed_out, request_id);
        }
        other => panic!("expected ApprovalTimeout, got {other:?}"),
    }

    // A late verdict is rejected.
    assert!(!table.resolve(&request_id, Decision { approved: true, reason: None }));
}

#[tokio::test]
async fn at_most_one_response_wins() {
    let table = Arc::new(ApprovalTable::new(Duration::from_secs(30)));
    let (uplink_tx, mut uplink_rx) = mpsc::channel(8);

    let worker = {
        let table = Arc::clone(&table);
        tokio::spawn(async move { table.request(&uplink_tx, prompt()).await })
    };

    let request_id = request_id_of(&uplink_rx.recv().await.unwrap());
    assert!(table.resolve(&request_id, Decision { approved: false, reason: Some("no".into()) }));
    // Second verdict for the same id loses.
    assert!(!table.resolve(&request_id, Decision { approved: true, reason: None }));

    let outcome = worker.await.unwrap();
    assert_eq!(
        outcome,
        ApprovalOutcome::Decided(Decision { approved: false, reason: Some("no".into()) })
    );
}

#[tokio::test]
async fn unknown_request_id_is_rejected() {
    let table = ApprovalTable::new(Duration::from_secs(30));
    assert!(!table.resolve(&RequestId::new("ghost"), Decision { approved: true, reason: None }));
}
