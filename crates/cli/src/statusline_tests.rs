// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use tempfile::tempdir;

const SID: &str = "11111111-2222-4333-8444-555555555555";

#[test]
fn status_file_round_trips() {
    let project = tempdir().unwrap();
    let writer = StatusWriter::new(project.path());
    let status = SessionStatus {
        session_id: SessionId::new(SID),
        connected: true,
        mode: Mode::Remote,
        timestamp: 1234,
    };
    writer.write(&status);

    let path = project.path().join(".vlaude").join(format!("session-{SID}.status"));
    let parsed: SessionStatus =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, status);

    writer.remove(&SessionId::new(SID));
    assert!(!path.exists());
}

#[test]
fn status_file_uses_camel_case_contract() {
    let project = tempdir().unwrap();
    let writer = StatusWriter::new(project.path());
    writer.write(&SessionStatus {
        session_id: SessionId::new(SID),
        connected: false,
        mode: Mode::Local,
        timestamp: 7,
    });

    let path = project.path().join(".vlaude").join(format!("session-{SID}.status"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["sessionId"], SID);
    assert_eq!(json["connected"], false);
    assert_eq!(json["mode"], "local");
}

#[tokio::test]
async fn switch_signal_is_consumed_and_deleted() {
    let project = tempdir().unwrap();
    let dir = project.path().join(".vlaude");
    std::fs::create_dir_all(&dir).unwrap();

    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    watch_switch_signal(project.path(), tx, cancel.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let signal = SwitchSignal {
        previous_session_id: SessionId::new("A"),
        current_session_id: SessionId::new("B"),
        timestamp: 42,
    };
    std::fs::write(
        dir.join("session-switch.signal"),
        serde_json::to_string(&signal).unwrap(),
    )
    .unwrap();

    let received =
        tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(received, signal);
    assert!(!dir.join("session-switch.signal").exists());
    cancel.cancel();
}

#[tokio::test]
async fn pre_existing_signal_is_picked_up_at_arm_time() {
    let project = tempdir().unwrap();
    let dir = project.path().join(".vlaude");
    std::fs::create_dir_all(&dir).unwrap();
    let signal = SwitchSignal {
        previous_session_id: SessionId::new("A"),
        current_session_id: SessionId::new("B"),
        timestamp: 42,
    };
    std::fs::write(
        dir.join("session-switch.signal"),
        serde_json::to_string(&signal).unwrap(),
    )
    .unwrap();

    let (tx, mut rx) = mpsc::channel(4);
    watch_switch_signal(project.path(), tx, CancellationToken::new()).unwrap();

    let received =
        tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(received.current_session_id, SessionId::new("B"));
}

#[tokio::test]
async fn heartbeat_writes_and_cleans_up() {
    let project = tempdir().unwrap();
    let writer = StatusWriter::new(project.path());
    let (state_tx, state_rx) = watch::channel(StatusState { connected: true, mode: Mode::Local });
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run_heartbeat(
        writer,
        SessionId::new(SID),
        state_rx,
        cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let path = project.path().join(".vlaude").join(format!("session-{SID}.status"));
    let parsed: SessionStatus =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(parsed.connected);
    assert_eq!(parsed.mode, Mode::Local);

    // Mode flips are written immediately.
    state_tx.send(StatusState { connected: true, mode: Mode::Remote }).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let parsed: SessionStatus =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.mode, Mode::Remote);

    cancel.cancel();
    task.await.unwrap();
    assert!(!path.exists());
}
