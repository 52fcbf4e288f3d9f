// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Outbound WebSocket uplink to the hub.
//!
//! The daemon appears as a client to the hub so each side's transport
//! listener stays independent: pushes travel daemon→server on this socket,
//! pulls travel server→daemon over HTTP. Reconnects forever with
//! exponential backoff capped at five seconds; frames queued while
//! disconnected wait in the outbox channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vlaude_wire::{ClientFrame, DaemonFrame, ServerFrame};

use crate::approval::{ApprovalTable, Decision};

const BACKOFF_START: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(5);

/// Run the uplink until shutdown.
pub async fn run_uplink(
    hub_url: String,
    host: String,
    mut outbox: mpsc::Receiver<DaemonFrame>,
    approvals: Arc<ApprovalTable>,
    expired_tx: mpsc::Sender<DaemonFrame>,
    shutdown: CancellationToken,
) {
    let mut backoff = BACKOFF_START;
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let mut ws = match connect_async(hub_url.as_str()).await {
            Ok((ws, _)) => {
                info!(url = %hub_url, "uplink connected");
                backoff = BACKOFF_START;
                ws
            }
            Err(e) => {
                debug!(url = %hub_url, error = %e, "uplink connect failed");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = shutdown.cancelled() => return,
                }
                backoff = (backoff * 2).min(BACKOFF_CAP);
                continue;
            }
        };

        let hello = ClientFrame::DaemonHello { host: host.clone() };
        match vlaude_wire::encode(&hello) {
            Ok(text) => {
                if ws.send(Message::Text(text.into())).await.is_err() {
                    continue;
                }
            }
            Err(e) => {
                warn!(error = %e, "hello encode failed");
                return;
            }
        }

        loop {
            tokio::select! {
                frame = outbox.recv() => {
                    let Some(frame) = frame else { return };
                    let text = match vlaude_wire::encode(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "frame encode failed, dropped");
                            continue;
                        }
                    };
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        warn!("uplink send failed, reconnecting");
                        break;
                    }
                }
                incoming = ws.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            handle_inbound(&text, &approvals, &expired_tx).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("uplink closed by hub, reconnecting");
                            break;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "uplink error, reconnecting");
                            break;
                        }
                        _ => {} // Ping/Pong/Binary — ignore
                    }
                }
                _ = shutdown.cancelled() => {
                    let _ = ws.close(None).await;
                    return;
                }
            }
        }
    }
}

/// The hub only ever sends approval-response relays down the uplink.
async fn handle_inbound(
    text: &str,
    approvals: &ApprovalTable,
    expired_tx: &mpsc::Sender<DaemonFrame>,
) {
    let frame: ServerFrame = match vlaude_wire::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, "undecodable uplink frame ignored");
            return;
        }
    };
    if let ServerFrame::ApprovalResponse { request_id, approved, reason, .. } = frame {
        let delivered = approvals.resolve(&request_id, Decision { approved, reason });
        if !delivered {
            // Late or duplicate verdict: reject explicitly, never silently.
            // try_send: this feeds the outbox the caller itself drains, so
            // blocking here on a full channel would wedge the uplink.
            let frame = DaemonFrame::ApprovalExpired {
                request_id,
                message: "approval already resolved or expired".to_string(),
            };
            if let Err(e) = expired_tx.try_send(frame) {
                warn!(error = %e, "expired notice dropped");
            }
        }
    }
}

#[cfg(test)]
#[path = "uplink_tests.rs"]
mod tests;
