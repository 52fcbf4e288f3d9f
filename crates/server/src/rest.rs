// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Mobile-facing REST surface.
//!
//! Store reads proxy the daemon link so the daemon stays the sole owner of
//! the on-disk tree. Every response uses the `{success, data, message?,
//! total?, hasMore?}` envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path as UrlPath, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::debug;
use vlaude_core::{Clock, SessionId};
use vlaude_wire::{
    ApiEnvelope, CreateSessionBody, GenerateTokenRequest, MessagesQuery, ProjectsQuery,
    SessionsQuery, TokenResponse,
};

use crate::daemon_link::LinkError;
use crate::dispatch::ServerCtx;
use crate::ws;

/// Build the full HTTP surface: REST + the WebSocket endpoint.
pub fn router(ctx: Arc<ServerCtx>) -> Router {
    let authed = Router::new()
        .route("/projects", get(projects))
        .route("/projects/{id}", get(project))
        .route("/sessions/by-path", get(sessions_by_path))
        .route("/sessions/by-session-id/{sid}", get(session_by_id))
        .route("/sessions/{sid}/messages", get(messages))
        .route("/sessions", post(create_session))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&ctx), require_auth));

    Router::new()
        .merge(authed)
        .route("/auth/generate-token", post(generate_token))
        .route("/ws", get(ws::ws_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Reject unauthenticated external requests before any handler runs.
async fn require_auth(
    State(ctx): State<Arc<ServerCtx>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let token = ws::bearer_token(request.headers()).or_else(|| query_token(&request));
    match ctx.auth.authenticate(addr.ip(), token.as_deref()) {
        Ok(_) => next.run(request).await,
        Err(e) => {
            debug!(peer = %addr, "request rejected");
            (StatusCode::UNAUTHORIZED, Json(ApiEnvelope::<()>::err(e.to_string())))
                .into_response()
        }
    }
}

fn query_token(request: &Request) -> Option<String> {
    let query = request.uri().query()?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "token").then(|| value.to_string())
    })
}

fn link_failure(e: LinkError) -> Response {
    (StatusCode::BAD_GATEWAY, Json(ApiEnvelope::<()>::err(e.to_string()))).into_response()
}

async fn projects(
    State(ctx): State<Arc<ServerCtx>>,
    Query(query): Query<ProjectsQuery>,
) -> Response {
    match ctx.link.list_projects(query.limit).await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => link_failure(e),
    }
}

async fn project(State(ctx): State<Arc<ServerCtx>>, UrlPath(id): UrlPath<String>) -> Response {
    match ctx.link.get_project(&id).await {
        Ok(envelope) if envelope.success => Json(envelope).into_response(),
        Ok(envelope) => (StatusCode::NOT_FOUND, Json(envelope)).into_response(),
        Err(e) => link_failure(e),
    }
}

async fn sessions_by_path(
    State(ctx): State<Arc<ServerCtx>>,
    Query(query): Query<SessionsQuery>,
) -> Response {
    match ctx.link.sessions_by_path(&query.path, query.limit).await {
        Ok(envelope) if envelope.success => Json(envelope).into_response(),
        Ok(envelope) => (StatusCode::NOT_FOUND, Json(envelope)).into_response(),
        Err(e) => link_failure(e),
    }
}

async fn session_by_id(
    State(ctx): State<Arc<ServerCtx>>,
    UrlPath(sid): UrlPath<String>,
) -> Response {
    match ctx.link.session_by_id(&SessionId::new(sid)).await {
        Ok(envelope) if envelope.success => Json(envelope).into_response(),
        Ok(envelope) => (StatusCode::NOT_FOUND, Json(envelope)).into_response(),
        Err(e) => link_failure(e),
    }
}

async fn messages(
    State(ctx): State<Arc<ServerCtx>>,
    UrlPath(sid): UrlPath<String>,
    Query(query): Query<MessagesQuery>,
) -> Response {
    match ctx.link.messages(&SessionId::new(sid), &query).await {
        Ok(envelope) if envelope.success => Json(envelope).into_response(),
        Ok(envelope) => (StatusCode::NOT_FOUND, Json(envelope)).into_response(),
        Err(e) => link_failure(e),
    }
}

async fn create_session(
    State(ctx): State<Arc<ServerCtx>>,
    Json(body): Json<CreateSessionBody>,
) -> Response {
    match ctx.link.create_session(body).await {
        Ok(()) => Json(ApiEnvelope::ok(())).into_response(),
        Err(e) => link_failure(e),
    }
}

/// Mobile onboarding: sign a token for the presented device name.
async fn generate_token(
    State(ctx): State<Arc<ServerCtx>>,
    Json(body): Json<GenerateTokenRequest>,
) -> Response {
    let subject = body.device_name.unwrap_or_else(|| "mobile".to_string());
    let now_secs = ctx.clock.epoch_ms() / 1000;
    match ctx.auth.issue(&subject, now_secs) {
        Ok(token) => Json(ApiEnvelope::ok(TokenResponse { token })).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiEnvelope::<()>::err(e.to_string())),
        )
            .into_response(),
    }
}
