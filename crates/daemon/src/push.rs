// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Bridges transcript watcher events onto the uplink.
//!
//! Runs as one task so per-session ordering is the watcher's ordering. Each
//! new message also refreshes the session metadata push, which is what keeps
//! mobile session lists current without polling.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vlaude_store::{TranscriptStore, WatchEvent};
use vlaude_wire::DaemonFrame;

/// Forward watch events until the channel closes or shutdown.
pub async fn run_push_bridge(
    store: TranscriptStore,
    mut watch_rx: mpsc::Receiver<WatchEvent>,
    uplink: mpsc::Sender<DaemonFrame>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            event = watch_rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = shutdown.cancelled() => break,
        };

        match event {
            WatchEvent::NewMessage { session_id, real_path, message } => {
                let frame = DaemonFrame::NewMessage {
                    session_id: session_id.clone(),
                    real_path: real_path.clone(),
                    message,
                };
                if uplink.send(frame).await.is_err() {
                    break;
                }
                if let Ok(metadata) = store.session_meta(&session_id, &real_path) {
                    let frame = DaemonFrame::SessionUpdated { session_id, metadata };
                    if uplink.send(frame).await.is_err() {
                        break;
                    }
                }
            }
            WatchEvent::Metrics { session_id, metrics } => {
                let frame = DaemonFrame::Metrics { session_id, metrics };
                if uplink.send(frame).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("push bridge stopped");
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
