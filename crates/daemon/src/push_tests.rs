// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use std::sync::Arc;
use tempfile::tempdir;
use vlaude_core::{SessionId, SessionMetrics};
use vlaude_store::PathMap;

const SID: &str = "11111111-2222-4333-8444-555555555555";

fn seeded_store(root: &std::path::Path) -> TranscriptStore {
    let dir = root.join("-p");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("{SID}.jsonl")),
        serde_json::json!({"type": "user", "uuid": "u1", "message": {}}).to_string() + "\n",
    )
    .unwrap();
    let map = Arc::new(PathMap::new(root));
    map.learn("/p", "-p");
    TranscriptStore::new(root, map)
}

#[tokio::test]
async fn new_message_forwards_message_then_metadata() {
    let root = tempdir().unwrap();
    let store = seeded_store(root.path());
    let (watch_tx, watch_rx) = mpsc::channel(8);
    let (uplink_tx, mut uplink_rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    tokio::spawn(run_push_bridge(store, watch_rx, uplink_tx, shutdown.clone()));

    watch_tx
        .send(WatchEvent::NewMessage {
            session_id: SessionId::new(SID),
            real_path: "/p".into(),
            message: serde_json::json!({"uuid": "u1"}),
        })
        .await
        .unwrap();

    match uplink_rx.recv().await.unwrap() {
        DaemonFrame::NewMessage { session_id, message, .. } => {
            assert_eq!(session_id, SessionId::new(SID));
            assert_eq!(message["uuid"], "u1");
        }
        other => panic!("expected NewMessage, got {other:?}"),
    }
    match uplink_rx.recv().await.unwrap() {
        DaemonFrame::SessionUpdated { metadata, .. } => {
            assert_eq!(metadata.message_count, 1);
        }
        other => panic!("expected SessionUpdated, got {other:?}"),
    }
    shutdown.cancel();
}

#[tokio::test]
async fn metrics_forward_as_is() {
    let root = tempdir().unwrap();
    let store = seeded_store(root.path());
    let (watch_tx, watch_rx) = mpsc::channel(8);
    let (uplink_tx, mut uplink_rx) = mpsc::channel(8);
    tokio::spawn(run_push_bridge(store, watch_rx, uplink_tx, CancellationToken::new()));

    let metrics = SessionMetrics { input_tokens: 5, ..Default::default() };
    watch_tx
        .send(WatchEvent::Metrics { session_id: SessionId::new(SID), metrics })
        .await
        .unwrap();

    match uplink_rx.recv().await.unwrap() {
        DaemonFrame::Metrics { metrics, .. } => assert_eq!(metrics.input_tokens, 5),
        other => panic!("expected Metrics, got {other:?}"),
    }
}
