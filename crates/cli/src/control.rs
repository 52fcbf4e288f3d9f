// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Control-socket client: the CLI's WebSocket connection to the hub.
//!
//! Reconnects forever with exponential backoff capped at five seconds.
//! The driver observes connectivity transitions through `ControlEvent` so
//! it can re-join its session after an outage and pause the status-file
//! heartbeat while offline.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vlaude_wire::{ClientFrame, ServerFrame};

const BACKOFF_START: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(5);

/// Event surfaced to the driver.
#[derive(Debug)]
pub enum ControlEvent {
    Connected,
    Disconnected,
    Frame(ServerFrame),
}

/// Handle to the control connection.
pub struct ControlSocket {
    outgoing: mpsc::Sender<ClientFrame>,
    pub events: mpsc::Receiver<ControlEvent>,
    connected: watch::Receiver<bool>,
}

impl ControlSocket {
    /// Spawn the connection task. Must be called within a tokio runtime.
    pub fn connect(url: String, cancel: CancellationToken) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(256);
        let (connected_tx, connected_rx) = watch::channel(false);
        tokio::spawn(connection_task(url, outgoing_rx, events_tx, connected_tx, cancel));
        Self { outgoing: outgoing_tx, events: events_rx, connected: connected_rx }
    }

    /// Queue a frame; waits while the outbox is full, drops when the
    /// connection task is gone.
    pub async fn send(&self, frame: ClientFrame) -> bool {
        self.outgoing.send(frame).await.is_ok()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Clone of the outbox for use inside spawned tasks.
    pub fn sender(&self) -> mpsc::Sender<ClientFrame> {
        self.outgoing.clone()
    }
}

async fn connection_task(
    url: String,
    mut outgoing: mpsc::Receiver<ClientFrame>,
    events: mpsc::Sender<ControlEvent>,
    connected: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut backoff = BACKOFF_START;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let mut ws = match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                debug!(%url, "control socket connected");
                backoff = BACKOFF_START;
                let _ = connected.send(true);
                let _ = events.send(ControlEvent::Connected).await;
                ws
            }
            Err(e) => {
                debug!(%url, error = %e, "control connect failed");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = cancel.cancelled() => return,
                }
                backoff = (backoff * 2).min(BACKOFF_CAP);
                continue;
            }
        };

        loop {
            tokio::select! {
                frame = outgoing.recv() => {
                    let Some(frame) = frame else { return };
                    let text = match vlaude_wire::encode(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "control frame encode failed");
                            continue;
                        }
                    };
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                incoming = ws.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            match vlaude_wire::decode::<ServerFrame>(&text) {
                                Ok(frame) => {
                                    let _ = events.send(ControlEvent::Frame(frame)).await;
                                }
                                Err(e) => debug!(error = %e, "bad control frame ignored"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            debug!(error = %e, "control socket error");
                            break;
                        }
                        _ => {} // Ping/Pong/Binary — ignore
                    }
                }
                _ = cancel.cancelled() => {
                    let _ = ws.close(None).await;
                    return;
                }
            }
        }

        let _ = connected.send(false);
        let _ = events.send(ControlEvent::Disconnected).await;
    }
}
