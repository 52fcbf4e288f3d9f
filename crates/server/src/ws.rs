// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! WebSocket endpoint: authentication, connection lifecycle, frame pumps.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vlaude_core::ClientId;
use vlaude_wire::{ClientFrame, DaemonFrame, ServerFrame};

use crate::auth::AuthSubject;
use crate::dispatch::{
    handle_client_frame, handle_daemon_frame, handle_disconnect, is_daemon_connection, ServerCtx,
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Pull a bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// `GET /ws` — authenticate, then upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<ServerCtx>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let token = bearer_token(&headers).or(query.token);
    match ctx.auth.authenticate(addr.ip(), token.as_deref()) {
        Ok(subject) => ws.on_upgrade(move |socket| handle_socket(socket, ctx, subject)),
        Err(e) => {
            warn!(peer = %addr, "websocket rejected");
            (StatusCode::UNAUTHORIZED, e.to_string()).into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, ctx: Arc<ServerCtx>, subject: AuthSubject) {
    let client_id = ClientId::generate();
    let (outbox_tx, outbox_rx) = mpsc::channel::<ServerFrame>(256);
    ctx.hub.register(client_id.clone(), subject.subject, subject.trusted, outbox_tx);
    debug!(%client_id, trusted = subject.trusted, "connection accepted");

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(pump_outbox(outbox_rx, sink));

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!(%client_id, error = %e, "socket error");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                if is_daemon_connection(&ctx, &client_id) {
                    match vlaude_wire::decode::<DaemonFrame>(&text) {
                        Ok(frame) => handle_daemon_frame(&ctx, frame).await,
                        Err(e) => debug!(%client_id, error = %e, "bad daemon frame"),
                    }
                } else {
                    match vlaude_wire::decode::<ClientFrame>(&text) {
                        Ok(frame) => handle_client_frame(&ctx, &client_id, frame).await,
                        Err(e) => {
                            debug!(%client_id, error = %e, "bad client frame");
                            ctx.hub.send(
                                &client_id,
                                ServerFrame::Ack {
                                    success: false,
                                    message: Some("unrecognized frame".to_string()),
                                },
                            );
                        }
                    }
                }
            }
            Message::Close(_) => break,
            _ => {} // Ping/Pong/Binary — ignore
        }
    }

    handle_disconnect(&ctx, &client_id).await;
    writer.abort();
}

async fn pump_outbox(
    mut outbox_rx: mpsc::Receiver<ServerFrame>,
    mut sink: futures_util::stream::SplitSink<WebSocket, Message>,
) {
    while let Some(frame) = outbox_rx.recv().await {
        let text = match vlaude_wire::encode(&frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "outbound frame encode failed");
                continue;
            }
        };
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}
