// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use axum::body::Body;
use axum::http::{header, Method, Request};
use tempfile::tempdir;
use tower::ServiceExt;

const SID: &str = "11111111-2222-4333-8444-555555555555";

fn seed_session(root: &std::path::Path) {
    let dir = root.join("-p");
    std::fs::create_dir_all(&dir).unwrap();
    let lines = [
        serde_json::json!({"type": "user", "uuid": "u1", "cwd": "/p", "message": {}}),
        serde_json::json!({"type": "assistant", "uuid": "a1", "message": {}}),
    ];
    let content: String = lines.map(|l| l.to_string() + "\n").concat();
    std::fs::write(dir.join(format!("{SID}.jsonl")), content).unwrap();
}

async fn call(router: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> serde_json::Value {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder().method(method).uri(uri).body(Body::empty()).unwrap(),
    };
    let response = router.oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn messages_endpoint_paginates() {
    let root = tempdir().unwrap();
    seed_session(root.path());
    let (ctx, _uplink, _assistant) = test_ctx(root.path());

    let body = call(
        router(ctx),
        Method::GET,
        &format!("/sessions/{SID}/messages?projectPath=/p&limit=1&offset=0&order=desc"),
        None,
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["data"][0]["uuid"], "a1");
}

#[tokio::test]
async fn messages_endpoint_reports_unknown_project() {
    let root = tempdir().unwrap();
    let (ctx, _uplink, _assistant) = test_ctx(root.path());

    let body = call(
        router(ctx),
        Method::GET,
        &format!("/sessions/{SID}/messages?projectPath=/nope&limit=10"),
        None,
    )
    .await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn check_loading_reflects_fresh_transcript() {
    let root = tempdir().unwrap();
    seed_session(root.path());
    let (ctx, _uplink, _assistant) = test_ctx(root.path());

    let body = call(
        router(ctx),
        Method::POST,
        "/sessions/check-loading",
        Some(serde_json::json!({"sessionId": SID, "realPath": "/p"})),
    )
    .await;
    assert_eq!(body["success"], true);
    // Just written: inside the mtime window.
    assert_eq!(body["data"]["loading"], true);
}

#[tokio::test]
async fn send_message_pauses_and_delivers() {
    let root = tempdir().unwrap();
    seed_session(root.path());
    let (ctx, _uplink, assistant) = test_ctx(root.path());

    let body = call(
        router(Arc::clone(&ctx)),
        Method::POST,
        "/sessions/send-message",
        Some(serde_json::json!({
            "sessionId": SID, "text": "hello", "realPath": "/p", "clientId": "m1"
        })),
    )
    .await;
    assert_eq!(body["success"], true);

    // Delivery runs in a spawned task.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let deliveries = assistant.deliveries.lock();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].text, "hello");
    assert_eq!(deliveries[0].client_id, Some(vlaude_core::ClientId::new("m1")));
}

#[tokio::test]
async fn projects_endpoint_lists_store() {
    let root = tempdir().unwrap();
    seed_session(root.path());
    let (ctx, _uplink, _assistant) = test_ctx(root.path());

    let body = call(router(ctx), Method::GET, "/projects", None).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["realPath"], "/p");
    assert_eq!(body["data"][0]["sessionCount"], 1);
}

#[tokio::test]
async fn find_new_probe_answers_inline() {
    let root = tempdir().unwrap();
    seed_session(root.path());
    let (ctx, _uplink, _assistant) = test_ctx(root.path());

    let body = call(
        router(ctx),
        Method::POST,
        "/sessions/find-new",
        Some(serde_json::json!({"realPath": "/p"})),
    )
    .await;
    assert_eq!(body["data"]["sessionId"], SID);
}

#[tokio::test]
async fn detect_new_pushes_over_uplink() {
    let root = tempdir().unwrap();
    seed_session(root.path());
    let (ctx, mut uplink, _assistant) = test_ctx(root.path());

    let body = call(
        router(Arc::clone(&ctx)),
        Method::POST,
        "/sessions/detect-new",
        Some(serde_json::json!({"realPath": "/p", "cliClientId": "cli-1"})),
    )
    .await;
    assert_eq!(body["success"], true);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let new_sid = "22222222-2222-4333-8444-555555555555";
    std::fs::write(root.path().join("-p").join(format!("{new_sid}.jsonl")), "{}\n").unwrap();

    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), uplink.recv())
        .await
        .unwrap()
        .unwrap();
    match frame {
        vlaude_wire::DaemonFrame::NewSessionCreated { session_id, cli_client_id, .. } => {
            assert_eq!(session_id.as_str(), new_sid);
            assert_eq!(cli_client_id, Some(vlaude_core::ClientId::new("cli-1")));
        }
        other => panic!("expected NewSessionCreated, got {other:?}"),
    }
}
