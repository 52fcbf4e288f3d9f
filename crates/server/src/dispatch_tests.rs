// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use crate::daemon_link::fake::{FakeDaemonLink, LinkCall};
use std::path::PathBuf;
use tokio::sync::mpsc;
use vlaude_core::{Mode, SessionId};

struct Harness {
    ctx: Arc<ServerCtx>,
    link: Arc<FakeDaemonLink>,
}

fn harness() -> Harness {
    let link = Arc::new(FakeDaemonLink::default());
    let ctx = Arc::new(ServerCtx {
        hub: Hub::new(),
        router: SubscriptionRouter::new(),
        matcher: UuidMatcher::new(),
        arbiter: ModeArbiter::new(),
        approvals: ApprovalRouter::new(),
        link: Arc::clone(&link) as Arc<dyn DaemonApi>,
        auth: Auth::new(None, None, &["127.0.0.0/8".to_string()]).unwrap(),
        daemon_client: Mutex::new(None),
        clock: SystemClock,
    });
    Harness { ctx, link }
}

impl Harness {
    fn connect(&self, id: &str, trusted: bool) -> mpsc::Receiver<ServerFrame> {
        let (tx, rx) = mpsc::channel(32);
        self.ctx.hub.register(ClientId::new(id), None, trusted, tx);
        rx
    }

    async fn client(&self, id: &str, frame: ClientFrame) {
        handle_client_frame(&self.ctx, &ClientId::new(id), frame).await;
    }

    async fn daemon(&self, frame: DaemonFrame) {
        handle_daemon_frame(&self.ctx, frame).await;
    }
}

fn sid() -> SessionId {
    SessionId::new("A")
}

fn join(client_type: vlaude_core::ClientType) -> ClientFrame {
    ClientFrame::Join { session_id: sid(), client_type, real_path: PathBuf::from("/p") }
}

fn drain(rx: &mut mpsc::Receiver<ServerFrame>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn mobile_join_flips_mode_and_nudges_cli() {
    let h = harness();
    let mut cli_rx = h.connect("cli", true);
    let _mobile_rx = h.connect("m1", false);

    h.client("cli", join(vlaude_core::ClientType::Cli)).await;
    h.client("m1", join(vlaude_core::ClientType::Mobile)).await;

    assert_eq!(h.ctx.arbiter.mode(&sid()), Mode::Remote);
    let frames = drain(&mut cli_rx);
    assert!(frames.iter().any(|f| matches!(f, ServerFrame::RemoteConnect { .. })));
}

#[tokio::test]
async fn subscribe_edges_drive_daemon_watch_refs() {
    let h = harness();
    let _a = h.connect("a", false);
    let _b = h.connect("b", false);

    h.client("a", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    h.client("b", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    h.client("a", ClientFrame::Unsubscribe { session_id: sid() }).await;
    h.client("b", ClientFrame::Unsubscribe { session_id: sid() }).await;

    let calls = h.link.calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            LinkCall::Watch(sid(), PathBuf::from("/p")),
            LinkCall::Unwatch(sid()),
        ]
    );
}

#[tokio::test]
async fn send_before_join_is_a_protocol_violation() {
    let h = harness();
    let mut rx = h.connect("m1", false);

    h.client("m1", ClientFrame::SendMessage { session_id: sid(), text: "hi".into() }).await;

    match drain(&mut rx).pop().unwrap() {
        ServerFrame::Ack { success, message } => {
            assert!(!success);
            assert_eq!(message.as_deref(), Some(JOIN_FIRST_MESSAGE));
        }
        other => panic!("expected Ack, got {other:?}"),
    }
    assert!(h.link.calls.lock().is_empty());
}

#[tokio::test]
async fn send_after_join_reaches_daemon_with_client_id() {
    let h = harness();
    let _rx = h.connect("m1", false);

    h.client("m1", join(vlaude_core::ClientType::Mobile)).await;
    h.client("m1", ClientFrame::SendMessage { session_id: sid(), text: "hello".into() }).await;

    let calls = h.link.calls.lock().clone();
    match &calls[0] {
        LinkCall::SendMessage(body) => {
            assert_eq!(body.text, "hello");
            assert_eq!(body.real_path, PathBuf::from("/p"));
            assert_eq!(body.client_id, Some(ClientId::new("m1")));
        }
        other => panic!("expected SendMessage, got {other:?}"),
    }
}

#[tokio::test]
async fn uuid_match_confirms_to_cli() {
    let h = harness();
    let mut cli_rx = h.connect("cli", true);

    h.client("cli", ClientFrame::ReportUuid { uuid: "A".into(), real_path: "/p".into() }).await;
    assert!(drain(&mut cli_rx).is_empty());

    h.daemon(DaemonFrame::NewSessionCreated {
        session_id: sid(),
        real_path: "/p".into(),
        cli_client_id: None,
    })
    .await;

    match drain(&mut cli_rx).pop().unwrap() {
        ServerFrame::SessionConfirmed { session_id } => assert_eq!(session_id, sid()),
        other => panic!("expected SessionConfirmed, got {other:?}"),
    }
}

#[tokio::test]
async fn exit_remote_denied_while_loading() {
    let h = harness();
    let mut cli_rx = h.connect("cli", true);
    h.client("cli", join(vlaude_core::ClientType::Cli)).await;

    *h.link.loading.lock() = true;
    h.client("cli", ClientFrame::RequestExitRemote { session_id: sid() }).await;
    assert_eq!(h.ctx.arbiter.mode(&sid()), Mode::Remote);
    let last = drain(&mut cli_rx).pop().unwrap();
    assert!(matches!(last, ServerFrame::ExitRemoteDenied { ref reason, .. } if reason == "loading"));

    *h.link.loading.lock() = false;
    h.client("cli", ClientFrame::RequestExitRemote { session_id: sid() }).await;
    assert_eq!(h.ctx.arbiter.mode(&sid()), Mode::Local);
    let last = drain(&mut cli_rx).pop().unwrap();
    assert!(matches!(last, ServerFrame::ExitRemoteAllowed { .. }));
}

#[tokio::test]
async fn new_message_fans_out_to_subscribers_once() {
    let h = harness();
    let mut a_rx = h.connect("a", false);
    let mut b_rx = h.connect("b", false);
    let mut idle_rx = h.connect("idle", false);

    h.client("a", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    h.client("b", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    drain(&mut a_rx);
    drain(&mut b_rx);

    h.daemon(DaemonFrame::NewMessage {
        session_id: sid(),
        real_path: "/p".into(),
        message: serde_json::json!({"uuid": "u1"}),
    })
    .await;

    for rx in [&mut a_rx, &mut b_rx] {
        let frames = drain(rx);
        assert_eq!(
            frames
                .iter()
                .filter(|f| matches!(f, ServerFrame::NewMessage { .. }))
                .count(),
            1
        );
    }
    assert!(drain(&mut idle_rx).is_empty());
}

#[tokio::test]
async fn fan_out_preserves_watcher_order() {
    let h = harness();
    let mut rx = h.connect("a", false);
    h.client("a", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    drain(&mut rx);

    for n in 0..5 {
        h.daemon(DaemonFrame::NewMessage {
            session_id: sid(),
            real_path: "/p".into(),
            message: serde_json::json!({"seq": n}),
        })
        .await;
    }

    let seqs: Vec<i64> = drain(&mut rx)
        .into_iter()
        .filter_map(|f| match f {
            ServerFrame::NewMessage { message, .. } => message["seq"].as_i64(),
            _ => None,
        })
        .collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn approval_request_targets_originating_client() {
    let h = harness();
    let _daemon_rx = h.connect("d", true);
    h.client("d", ClientFrame::DaemonHello { host: "host".into() }).await;
    let mut m1_rx = h.connect("m1", false);
    let mut m2_rx = h.connect("m2", false);
    h.client("m1", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    h.client("m2", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    drain(&mut m1_rx);
    drain(&mut m2_rx);

    h.daemon(DaemonFrame::ApprovalRequest {
        request_id: vlaude_core::RequestId::new("r1"),
        session_id: sid(),
        tool_name: "shell.run".into(),
        input: serde_json::json!({"cmd": "ls"}),
        tool_use_id: "tu1".into(),
        description: "Run a command".into(),
        target_client_id: Some(ClientId::new("m1")),
    })
    .await;

    assert!(matches!(
        drain(&mut m1_rx).pop(),
        Some(ServerFrame::ApprovalRequest { .. })
    ));
    assert!(drain(&mut m2_rx).is_empty());
    assert_eq!(h.ctx.approvals.open_routes(), 1);
}

#[tokio::test]
async fn approval_request_falls_back_to_most_recent_subscriber() {
    let h = harness();
    let mut m1_rx = h.connect("m1", false);
    let mut m2_rx = h.connect("m2", false);
    h.client("m1", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    h.client("m2", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    drain(&mut m1_rx);
    drain(&mut m2_rx);

    h.daemon(DaemonFrame::ApprovalRequest {
        request_id: vlaude_core::RequestId::new("r1"),
        session_id: sid(),
        tool_name: "shell.run".into(),
        input: serde_json::Value::Null,
        tool_use_id: "tu1".into(),
        description: String::new(),
        // Originator has since disconnected.
        target_client_id: Some(ClientId::new("gone")),
    })
    .await;

    assert!(drain(&mut m1_rx).is_empty());
    assert!(matches!(
        drain(&mut m2_rx).pop(),
        Some(ServerFrame::ApprovalRequest { .. })
    ));
}

#[tokio::test]
async fn approval_response_relays_to_daemon() {
    let h = harness();
    let mut daemon_rx = h.connect("d", true);
    h.client("d", ClientFrame::DaemonHello { host: "host".into() }).await;
    drain(&mut daemon_rx);
    let _m1_rx = h.connect("m1", false);

    h.client(
        "m1",
        ClientFrame::ApprovalResponse {
            request_id: vlaude_core::RequestId::new("r1"),
            approved: true,
            reason: None,
        },
    )
    .await;

    match drain(&mut daemon_rx).pop().unwrap() {
        ServerFrame::ApprovalResponse { request_id, approved, client_id, .. } => {
            assert_eq!(request_id, vlaude_core::RequestId::new("r1"));
            assert!(approved);
            assert_eq!(client_id, Some(ClientId::new("m1")));
        }
        other => panic!("expected ApprovalResponse relay, got {other:?}"),
    }
}

#[tokio::test]
async fn approval_expired_is_broadcast() {
    let h = harness();
    let mut m1_rx = h.connect("m1", false);
    let mut m2_rx = h.connect("m2", false);

    h.daemon(DaemonFrame::ApprovalExpired {
        request_id: vlaude_core::RequestId::new("r1"),
        message: "late".into(),
    })
    .await;

    assert!(matches!(drain(&mut m1_rx).pop(), Some(ServerFrame::ApprovalExpired { .. })));
    assert!(matches!(drain(&mut m2_rx).pop(), Some(ServerFrame::ApprovalExpired { .. })));
}

#[tokio::test]
async fn daemon_hello_from_untrusted_is_rejected() {
    let h = harness();
    let mut rx = h.connect("evil", false);
    h.client("evil", ClientFrame::DaemonHello { host: "evil".into() }).await;

    assert!(h.ctx.daemon_client.lock().is_none());
    match drain(&mut rx).pop().unwrap() {
        ServerFrame::Ack { success, .. } => assert!(!success),
        other => panic!("expected Ack, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_releases_watchers_and_mode() {
    let h = harness();
    let mut cli_rx = h.connect("cli", true);
    let _m1 = h.connect("m1", false);

    h.client("cli", join(vlaude_core::ClientType::Cli)).await;
    h.client("m1", join(vlaude_core::ClientType::Mobile)).await;
    h.client("m1", ClientFrame::Subscribe { session_id: sid(), real_path: "/p".into() }).await;
    drain(&mut cli_rx);

    handle_disconnect(&h.ctx, &ClientId::new("m1")).await;

    assert_eq!(h.ctx.arbiter.mode(&sid()), Mode::Local);
    assert!(h.link.calls.lock().contains(&LinkCall::Unwatch(sid())));
    let frames = drain(&mut cli_rx);
    assert!(frames.iter().any(|f| matches!(f, ServerFrame::RemoteDisconnect)));
}

#[tokio::test]
async fn sdk_error_reaches_session_mobiles() {
    let h = harness();
    let mut m1_rx = h.connect("m1", false);
    h.client("m1", join(vlaude_core::ClientType::Mobile)).await;
    drain(&mut m1_rx);

    h.daemon(DaemonFrame::SdkError {
        session_id: sid(),
        error: vlaude_wire::SdkErrorInfo { error_type: "quota".into(), message: "out".into() },
    })
    .await;

    assert!(matches!(drain(&mut m1_rx).pop(), Some(ServerFrame::SdkError { .. })));
}
