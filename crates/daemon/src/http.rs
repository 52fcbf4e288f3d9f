// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Server-facing HTTP API.
//!
//! Trusted traffic only: the daemon binds loopback (or an internal address)
//! and performs no authentication of its own. The route set mirrors the
//! hub's REST surface one-to-one so the server can proxy store reads, plus
//! the coordination endpoints (send-message, check-loading, watch refs,
//! detector arming).

use std::sync::Arc;

use axum::extract::{Path as UrlPath, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vlaude_core::{SessionId, SessionMeta};
use vlaude_store::{NewSessionDetector, StoreError, TranscriptStore, TranscriptWatcher};
use vlaude_wire::{
    ApiEnvelope, CheckLoadingBody, CreateSessionBody, DetectNewBody, FindNewBody, FoundSession,
    LoadingStatus, MessagesQuery, ProjectsQuery, ResumePushBody, SendMessageBody, SessionsQuery,
    UnwatchBody, WatchBody,
};

use crate::assistant::{AssistantAdapter, DeliveryRequest};

/// Shared daemon context for all request handlers.
pub struct DaemonCtx {
    pub store: TranscriptStore,
    pub watcher: Arc<TranscriptWatcher>,
    pub detector: Arc<NewSessionDetector>,
    pub uplink: tokio::sync::mpsc::Sender<vlaude_wire::DaemonFrame>,
    pub assistant: Arc<dyn AssistantAdapter>,
    pub shutdown: CancellationToken,
}

/// Build the daemon's axum router.
pub fn router(ctx: Arc<DaemonCtx>) -> Router {
    Router::new()
        .route("/sessions/send-message", post(send_message))
        .route("/sessions/check-loading", post(check_loading))
        .route("/sessions/watch", post(watch))
        .route("/sessions/unwatch", post(unwatch))
        .route("/sessions/resume-push", post(resume_push))
        .route("/sessions/detect-new", post(detect_new))
        .route("/sessions/find-new", post(find_new))
        .route("/sessions", post(create_session))
        .route("/sessions/by-path", get(sessions_by_path))
        .route("/sessions/by-session-id/{sid}", get(session_by_id))
        .route("/sessions/{sid}/messages", get(messages))
        .route("/projects", get(projects))
        .route("/projects/{encoded}", get(project))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(ctx)
}

fn store_failure<T>(e: StoreError) -> Json<ApiEnvelope<T>> {
    debug!(error = %e, "store read failed");
    Json(ApiEnvelope::err(e.to_string()))
}

/// Deliver mobile text to the assistant, pausing watcher push for the
/// session while the daemon is the writer.
async fn send_message(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<SendMessageBody>,
) -> Json<ApiEnvelope<()>> {
    info!(session_id = %body.session_id, "delivering mobile message");
    ctx.watcher.pause(&body.session_id);

    let request = DeliveryRequest {
        session_id: Some(body.session_id.clone()),
        real_path: body.real_path.clone(),
        text: body.text,
        client_id: body.client_id,
    };
    let session_id = body.session_id;
    tokio::spawn(async move {
        if let Err(e) = ctx.assistant.deliver(request).await {
            warn!(%session_id, error = %e, "delivery failed");
            let frame = vlaude_wire::DaemonFrame::SdkError {
                session_id: session_id.clone(),
                error: e.to_sdk_error(),
            };
            let _ = ctx.uplink.send(frame).await;
        }
        // Unpause on completion; the tail replay carries the reply to
        // subscribers.
        ctx.watcher.resume(&session_id).await;
    });

    Json(ApiEnvelope::ok(()))
}

/// The mode arbiter's graceful-exit probe.
async fn check_loading(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<CheckLoadingBody>,
) -> Json<ApiEnvelope<LoadingStatus>> {
    match ctx.store.is_loading(&body.session_id, &body.real_path) {
        Ok(loading) => Json(ApiEnvelope::ok(LoadingStatus { loading })),
        Err(e) => store_failure(e),
    }
}

async fn watch(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<WatchBody>,
) -> Json<ApiEnvelope<()>> {
    ctx.watcher.acquire(&body.session_id, &body.real_path);
    Json(ApiEnvelope::ok(()))
}

async fn unwatch(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<UnwatchBody>,
) -> Json<ApiEnvelope<()>> {
    ctx.watcher.release(&body.session_id);
    Json(ApiEnvelope::ok(()))
}

/// Unpause watcher push after the CLI resumed locally.
async fn resume_push(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<ResumePushBody>,
) -> Json<ApiEnvelope<()>> {
    ctx.watcher.resume(&body.session_id).await;
    Json(ApiEnvelope::ok(()))
}

/// Arm the one-shot new-session detector; the detection is pushed over the
/// uplink when it fires.
async fn detect_new(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<DetectNewBody>,
) -> Json<ApiEnvelope<()>> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    if let Err(e) = ctx.detector.arm(
        &body.real_path,
        body.cli_client_id,
        tx,
        ctx.shutdown.child_token(),
    ) {
        warn!(real_path = %body.real_path.display(), error = %e, "detector arm failed");
        return Json(ApiEnvelope::err(e.to_string()));
    }
    let uplink = ctx.uplink.clone();
    tokio::spawn(async move {
        while let Some(detected) = rx.recv().await {
            let frame = vlaude_wire::DaemonFrame::NewSessionCreated {
                session_id: detected.session_id,
                real_path: detected.real_path,
                cli_client_id: detected.cli_client_id,
            };
            let _ = uplink.send(frame).await;
        }
    });
    Json(ApiEnvelope::ok(()))
}

async fn find_new(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<FindNewBody>,
) -> Json<ApiEnvelope<FoundSession>> {
    let session_id = ctx.detector.find_recent(&body.real_path);
    Json(ApiEnvelope::ok(FoundSession { session_id }))
}

/// Start a brand-new session from a mobile client: the assistant picks its
/// UUID and the transcript surfaces through the detector.
async fn create_session(
    State(ctx): State<Arc<DaemonCtx>>,
    Json(body): Json<CreateSessionBody>,
) -> Json<ApiEnvelope<()>> {
    let request = DeliveryRequest {
        session_id: None,
        real_path: body.real_path.clone(),
        text: body.text.unwrap_or_default(),
        client_id: body.client_id,
    };
    tokio::spawn(async move {
        if let Err(e) = ctx.assistant.deliver(request).await {
            warn!(real_path = %body.real_path.display(), error = %e, "session create failed");
        }
    });
    Json(ApiEnvelope::ok(()))
}

async fn projects(
    State(ctx): State<Arc<DaemonCtx>>,
    Query(query): Query<ProjectsQuery>,
) -> Json<ApiEnvelope<Vec<vlaude_core::ProjectMeta>>> {
    Json(ApiEnvelope::ok(ctx.store.list_projects(query.limit)))
}

async fn project(
    State(ctx): State<Arc<DaemonCtx>>,
    UrlPath(encoded): UrlPath<String>,
) -> Json<ApiEnvelope<vlaude_core::ProjectMeta>> {
    match ctx.store.project_by_encoded(&encoded) {
        Some(meta) => Json(ApiEnvelope::ok(meta)),
        None => Json(ApiEnvelope::err(format!("unknown project: {encoded}"))),
    }
}

async fn sessions_by_path(
    State(ctx): State<Arc<DaemonCtx>>,
    Query(query): Query<SessionsQuery>,
) -> Json<ApiEnvelope<Vec<SessionMeta>>> {
    match ctx.store.list_sessions(&query.path, query.limit) {
        Ok(sessions) => Json(ApiEnvelope::ok(sessions)),
        Err(e) => store_failure(e),
    }
}

async fn session_by_id(
    State(ctx): State<Arc<DaemonCtx>>,
    UrlPath(sid): UrlPath<String>,
) -> Json<ApiEnvelope<SessionMeta>> {
    match ctx.store.find_session(&SessionId::new(sid)) {
        Some(meta) => Json(ApiEnvelope::ok(meta)),
        None => Json(ApiEnvelope::err("session not found")),
    }
}

async fn messages(
    State(ctx): State<Arc<DaemonCtx>>,
    UrlPath(sid): UrlPath<String>,
    Query(query): Query<MessagesQuery>,
) -> Json<ApiEnvelope<Vec<serde_json::Value>>> {
    let session_id = SessionId::new(sid);
    match ctx.store.read_messages(
        &session_id,
        &query.project_path,
        query.limit,
        query.offset,
        query.order,
    ) {
        Ok(page) => Json(ApiEnvelope::paged(page.messages, page.total, page.has_more)),
        Err(e) => store_failure(e),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

#[cfg(test)]
pub(crate) fn test_ctx(
    store_root: &std::path::Path,
) -> (
    Arc<DaemonCtx>,
    tokio::sync::mpsc::Receiver<vlaude_wire::DaemonFrame>,
    Arc<crate::assistant::FakeAssistant>,
) {
    let path_map = Arc::new(vlaude_store::PathMap::new(store_root));
    path_map.preload();
    let store = TranscriptStore::new(store_root, Arc::clone(&path_map));
    let (watch_tx, _watch_rx) = tokio::sync::mpsc::channel(64);
    let watcher = Arc::new(TranscriptWatcher::new(store.clone(), watch_tx));
    let detector = Arc::new(NewSessionDetector::new(store_root, path_map));
    let (uplink_tx, uplink_rx) = tokio::sync::mpsc::channel(64);
    let assistant = Arc::new(crate::assistant::FakeAssistant::new());
    let ctx = Arc::new(DaemonCtx {
        store,
        watcher,
        detector,
        uplink: uplink_tx,
        assistant: Arc::clone(&assistant) as Arc<dyn AssistantAdapter>,
        shutdown: CancellationToken::new(),
    });
    (ctx, uplink_rx, assistant)
}
