// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Ref-counted transcript watchers.
//!
//! A watcher exists for a session exactly while at least one subscriber
//! holds a reference. Each filesystem change triggers a tail re-read; the
//! new last message and re-derived metrics are emitted on the shared event
//! channel. Paused sessions consume change events without delivering them —
//! used while the daemon itself is the writer — and replay the tail once on
//! resume if anything was missed.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vlaude_core::{SessionId, SessionMetrics};

use crate::transcript::TranscriptStore;

/// Event emitted by a transcript watcher.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The transcript gained a line; `message` is the latest deliverable
    /// record, whole.
    NewMessage { session_id: SessionId, real_path: PathBuf, message: serde_json::Value },
    /// Metrics re-derived after a change.
    Metrics { session_id: SessionId, metrics: SessionMetrics },
}

#[derive(Debug)]
struct WatchEntry {
    ref_count: usize,
    real_path: PathBuf,
    /// Present while a watch task is running.
    cancel: Option<CancellationToken>,
}

#[derive(Debug, Default)]
struct PauseState {
    paused: HashSet<SessionId>,
    missed: HashSet<SessionId>,
}

/// Ref-counted per-session file watchers over the store.
#[derive(Debug)]
pub struct TranscriptWatcher {
    store: TranscriptStore,
    events_tx: mpsc::Sender<WatchEvent>,
    entries: Arc<Mutex<HashMap<SessionId, WatchEntry>>>,
    pause: Arc<Mutex<PauseState>>,
}

impl TranscriptWatcher {
    pub fn new(store: TranscriptStore, events_tx: mpsc::Sender<WatchEvent>) -> Self {
        Self {
            store,
            events_tx,
            entries: Arc::new(Mutex::new(HashMap::new())),
            pause: Arc::new(Mutex::new(PauseState::default())),
        }
    }

    /// Take a reference on a session's watcher, opening it on 0→1.
    ///
    /// A missing transcript is warned and left unopened; the reference still
    /// counts and a later acquire retries the open. Must be called from
    /// within a tokio runtime.
    pub fn acquire(&self, session_id: &SessionId, real_path: &Path) {
        // Resolve before locking; the path lookup stats the store.
        let file = self.store.session_file(session_id, real_path);
        let spawn_args = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(session_id.clone()).or_insert_with(|| WatchEntry {
                ref_count: 0,
                real_path: real_path.to_path_buf(),
                cancel: None,
            });
            entry.ref_count += 1;
            if entry.cancel.is_some() {
                None
            } else {
                match file {
                    Ok(file) => {
                        let token = CancellationToken::new();
                        entry.cancel = Some(token.clone());
                        Some((file, token))
                    }
                    Err(e) => {
                        warn!(%session_id, error = %e, "transcript missing, watcher not opened");
                        None
                    }
                }
            }
        };

        if let Some((file, token)) = spawn_args {
            debug!(%session_id, file = %file.display(), "opening transcript watcher");
            tokio::spawn(watch_task(WatchTask {
                store: self.store.clone(),
                events_tx: self.events_tx.clone(),
                entries: Arc::clone(&self.entries),
                pause: Arc::clone(&self.pause),
                session_id: session_id.clone(),
                real_path: real_path.to_path_buf(),
                file,
                cancel: token,
            }));
        }
    }

    /// Drop a reference; the watcher closes when the count reaches zero.
    pub fn release(&self, session_id: &SessionId) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(session_id) else {
            debug!(%session_id, "release without acquire ignored");
            return;
        };
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count == 0 {
            if let Some(token) = entry.cancel.take() {
                token.cancel();
            }
            entries.remove(session_id);
            let mut pause = self.pause.lock();
            pause.paused.remove(session_id);
            pause.missed.remove(session_id);
            debug!(%session_id, "transcript watcher closed");
        }
    }

    /// Silence deliveries for a session while keeping the watcher armed.
    pub fn pause(&self, session_id: &SessionId) {
        self.pause.lock().paused.insert(session_id.clone());
    }

    /// Re-enable deliveries; replays the tail once if changes were consumed
    /// while paused.
    pub async fn resume(&self, session_id: &SessionId) {
        let missed = {
            let mut pause = self.pause.lock();
            pause.paused.remove(session_id);
            pause.missed.remove(session_id)
        };
        if missed {
            let real_path = {
                let entries = self.entries.lock();
                entries.get(session_id).map(|e| e.real_path.clone())
            };
            if let Some(real_path) = real_path {
                emit_tail(&self.store, &self.events_tx, session_id, &real_path).await;
            }
        }
    }

    /// Whether a watch task is currently running for the session.
    pub fn is_watching(&self, session_id: &SessionId) -> bool {
        self.entries.lock().get(session_id).is_some_and(|e| e.cancel.is_some())
    }

    /// Current reference count for the session.
    pub fn ref_count(&self, session_id: &SessionId) -> usize {
        self.entries.lock().get(session_id).map_or(0, |e| e.ref_count)
    }
}

struct WatchTask {
    store: TranscriptStore,
    events_tx: mpsc::Sender<WatchEvent>,
    entries: Arc<Mutex<HashMap<SessionId, WatchEntry>>>,
    pause: Arc<Mutex<PauseState>>,
    session_id: SessionId,
    real_path: PathBuf,
    file: PathBuf,
    cancel: CancellationToken,
}

async fn watch_task(task: WatchTask) {
    let (change_tx, mut change_rx) = mpsc::channel::<()>(32);
    let _watcher_guard = match create_file_watcher(&task.file, change_tx) {
        Ok(w) => w,
        Err(e) => {
            warn!(session_id = %task.session_id, error = %e, "file watcher failed to open");
            close_handle(&task.entries, &task.session_id);
            return;
        }
    };

    loop {
        tokio::select! {
            changed = change_rx.recv() => {
                if changed.is_none() {
                    // The notify backend dropped its sender: log and close;
                    // the next acquire retries.
                    warn!(session_id = %task.session_id, "watch channel closed");
                    close_handle(&task.entries, &task.session_id);
                    break;
                }
                let suppressed = {
                    let mut pause = task.pause.lock();
                    if pause.paused.contains(&task.session_id) {
                        pause.missed.insert(task.session_id.clone());
                        true
                    } else {
                        false
                    }
                };
                if !suppressed {
                    emit_tail(&task.store, &task.events_tx, &task.session_id, &task.real_path)
                        .await;
                }
            }
            _ = task.cancel.cancelled() => break,
        }
    }
}

/// Drop the running-task marker after a watcher fault so the next acquire
/// can retry the open.
fn close_handle(entries: &Mutex<HashMap<SessionId, WatchEntry>>, session_id: &SessionId) {
    if let Some(entry) = entries.lock().get_mut(session_id) {
        entry.cancel = None;
    }
}

/// Re-read the transcript tail and emit the last message plus metrics.
async fn emit_tail(
    store: &TranscriptStore,
    events_tx: &mpsc::Sender<WatchEvent>,
    session_id: &SessionId,
    real_path: &Path,
) {
    match store.last_message(session_id, real_path) {
        Ok(Some(record)) => {
            let event = WatchEvent::NewMessage {
                session_id: session_id.clone(),
                real_path: real_path.to_path_buf(),
                message: record.into_value(),
            };
            let _ = events_tx.send(event).await;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(%session_id, error = %e, "tail re-read failed");
            return;
        }
    }

    if let Ok(records) = store.records(session_id, real_path) {
        let metrics = SessionMetrics::derive(records.iter());
        let event = WatchEvent::Metrics { session_id: session_id.clone(), metrics };
        let _ = events_tx.send(event).await;
    }
}

fn create_file_watcher(
    path: &Path,
    tx: mpsc::Sender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.blocking_send(());
        }
    })?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
