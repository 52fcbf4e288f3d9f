// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use vlaude_core::RequestId;

#[tokio::test]
async fn inbound_approval_response_resolves_pending() {
    let table = Arc::new(ApprovalTable::new(Duration::from_secs(30)));
    let (uplink_tx, mut uplink_rx) = mpsc::channel(8);
    let (expired_tx, mut expired_rx) = mpsc::channel(8);

    let worker = {
        let table = Arc::clone(&table);
        let prompt = crate::approval::ApprovalPrompt {
            session_id: vlaude_core::SessionId::new("s1"),
            tool_name: "shell.run".into(),
            input: serde_json::Value::Null,
            tool_use_id: "tu1".into(),
            description: String::new(),
            target_client_id: None,
        };
        tokio::spawn(async move { table.request(&uplink_tx, prompt).await })
    };
    let request_id = match uplink_rx.recv().await.unwrap() {
        DaemonFrame::ApprovalRequest { request_id, .. } => request_id,
        other => panic!("expected ApprovalRequest, got {other:?}"),
    };

    let relay = vlaude_wire::encode(&ServerFrame::ApprovalResponse {
        request_id,
        approved: true,
        reason: None,
        client_id: None,
    })
    .unwrap();
    handle_inbound(&relay, &table, &expired_tx).await;

    let outcome = worker.await.unwrap();
    assert!(matches!(
        outcome,
        crate::approval::ApprovalOutcome::Decided(Decision { approved: true, .. })
    ));
    assert!(expired_rx.try_recv().is_err());
}

#[tokio::test]
async fn late_approval_response_surfaces_expired() {
    let table = ApprovalTable::new(Duration::from_secs(30));
    let (expired_tx, mut expired_rx) = mpsc::channel(8);

    let relay = vlaude_wire::encode(&ServerFrame::ApprovalResponse {
        request_id: RequestId::new("ghost"),
        approved: true,
        reason: None,
        client_id: None,
    })
    .unwrap();
    handle_inbound(&relay, &table, &expired_tx).await;

    match expired_rx.recv().await.unwrap() {
        DaemonFrame::ApprovalExpired { request_id, .. } => {
            assert_eq!(request_id, RequestId::new("ghost"));
        }
        other => panic!("expected ApprovalExpired, got {other:?}"),
    }
}

#[tokio::test]
async fn non_approval_frames_are_ignored() {
    let table = ApprovalTable::new(Duration::from_secs(30));
    let (expired_tx, mut expired_rx) = mpsc::channel(8);

    let text = vlaude_wire::encode(&ServerFrame::RemoteDisconnect).unwrap();
    handle_inbound(&text, &table, &expired_tx).await;
    handle_inbound("not json", &table, &expired_tx).await;
    assert!(expired_rx.try_recv().is_err());
}
