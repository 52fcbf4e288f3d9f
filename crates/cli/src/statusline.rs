// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Filesystem side-channels shared with the out-of-process status line.
//!
//! Under `<project>/.vlaude/`: the CLI writes `session-<sid>.status` every
//! ~2 s while connected, and consumes `session-switch.signal` which the
//! status line writes when it observes the assistant internally switching
//! sessions (an in-program resume). `last-session-id` belongs to the
//! status line; the CLI never touches it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vlaude_core::{Clock, Mode, SessionId, SystemClock};

/// Heartbeat period for the status file.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(2);

const SIDECHANNEL_DIR: &str = ".vlaude";
const SWITCH_SIGNAL_FILE: &str = "session-switch.signal";

/// Contents of `session-<sid>.status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub connected: bool,
    pub mode: Mode,
    /// Epoch milliseconds; a status older than 5 s is stale.
    pub timestamp: u64,
}

/// Contents of `session-switch.signal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSignal {
    pub previous_session_id: SessionId,
    pub current_session_id: SessionId,
    pub timestamp: u64,
}

/// Writer for this CLI's status files.
#[derive(Clone)]
pub struct StatusWriter {
    dir: PathBuf,
}

impl StatusWriter {
    pub fn new(project: &Path) -> Self {
        Self { dir: project.join(SIDECHANNEL_DIR) }
    }

    fn status_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("session-{session_id}.status"))
    }

    /// Write the status file; creates the side-channel directory on first
    /// use.
    pub fn write(&self, status: &SessionStatus) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(error = %e, "status dir create failed");
            return;
        }
        let path = self.status_path(&status.session_id);
        match serde_json::to_string(status) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "status write failed");
                }
            }
            Err(e) => warn!(error = %e, "status encode failed"),
        }
    }

    /// Remove the status file on final exit.
    pub fn remove(&self, session_id: &SessionId) {
        let _ = std::fs::remove_file(self.status_path(session_id));
    }
}

/// Live state fed to the heartbeat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusState {
    pub connected: bool,
    pub mode: Mode,
}

/// Write the status file every ~2 s while connected, and immediately on
/// every state change (connect, disconnect, mode flip).
pub async fn run_heartbeat(
    writer: StatusWriter,
    session_id: SessionId,
    mut state_rx: watch::Receiver<StatusState>,
    cancel: CancellationToken,
) {
    let clock = SystemClock;
    loop {
        let state = *state_rx.borrow();
        writer.write(&SessionStatus {
            session_id: session_id.clone(),
            connected: state.connected,
            mode: state.mode,
            timestamp: clock.epoch_ms(),
        });
        tokio::select! {
            _ = tokio::time::sleep(HEARTBEAT_PERIOD), if state.connected => {}
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
    writer.remove(&session_id);
}

/// Watch for `session-switch.signal`, consuming (and deleting) each one.
///
/// Checks once at arm time so a signal written while the CLI was briefly
/// away is not missed.
pub fn watch_switch_signal(
    project: &Path,
    tx: mpsc::Sender<SwitchSignal>,
    cancel: CancellationToken,
) -> notify::Result<()> {
    let dir = project.join(SIDECHANNEL_DIR);
    std::fs::create_dir_all(&dir).map_err(notify::Error::io)?;

    let (change_tx, mut change_rx) = mpsc::channel::<()>(8);
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if res.is_ok() {
                let _ = change_tx.blocking_send(());
            }
        })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    tokio::spawn(async move {
        let _watcher_guard = watcher;
        if let Some(signal) = consume_switch_signal(&dir) {
            let _ = tx.send(signal).await;
        }
        loop {
            tokio::select! {
                changed = change_rx.recv() => {
                    if changed.is_none() {
                        break;
                    }
                    if let Some(signal) = consume_switch_signal(&dir) {
                        if tx.send(signal).await.is_err() {
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    });
    Ok(())
}

/// Read and delete the switch signal, if present.
fn consume_switch_signal(dir: &Path) -> Option<SwitchSignal> {
    let path = dir.join(SWITCH_SIGNAL_FILE);
    let content = std::fs::read_to_string(&path).ok()?;
    let signal: SwitchSignal = match serde_json::from_str(&content) {
        Ok(signal) => signal,
        Err(e) => {
            debug!(error = %e, "bad switch signal dropped");
            let _ = std::fs::remove_file(&path);
            return None;
        }
    };
    let _ = std::fs::remove_file(&path);
    Some(signal)
}

#[cfg(test)]
#[path = "statusline_tests.rs"]
mod tests;
