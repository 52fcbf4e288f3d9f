// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! One-shot detection of newly created session transcripts.
//!
//! A CLI that launched the assistant without a session id asks the daemon to
//! watch its project directory; the first valid transcript that was not in
//! the arming snapshot fires exactly one event and the watch closes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vlaude_core::{ClientId, SessionId};

use crate::path_map::PathMap;

/// A session file younger than this counts as "just created" for the
/// non-blocking find probe.
const FIND_WINDOW: Duration = Duration::from_secs(60);

/// Errors from arming a detector.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),
}

/// Event fired when a previously unseen transcript appears.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSession {
    pub session_id: SessionId,
    pub real_path: PathBuf,
    /// The CLI whose watch request armed this detector, when any.
    pub cli_client_id: Option<ClientId>,
}

/// Per-project new-session detectors over the store.
#[derive(Debug)]
pub struct NewSessionDetector {
    root: PathBuf,
    path_map: Arc<PathMap>,
}

impl NewSessionDetector {
    pub fn new(root: impl Into<PathBuf>, path_map: Arc<PathMap>) -> Self {
        Self { root: root.into(), path_map }
    }

    /// Arm a one-shot watch for `real_path`, creating the project directory
    /// if the assistant has not written yet (the one sanctioned use of
    /// encoding synthesis).
    ///
    /// Emits at most one [`DetectedSession`] on `tx`, then closes. Must be
    /// called from within a tokio runtime.
    pub fn arm(
        &self,
        real_path: &Path,
        cli_client_id: Option<ClientId>,
        tx: mpsc::Sender<DetectedSession>,
        cancel: CancellationToken,
    ) -> Result<(), DetectorError> {
        let encoded = match self.path_map.resolve_or_refresh(real_path) {
            Some(encoded) => encoded,
            None => self.path_map.synthesize(real_path)?,
        };
        let dir = self.root.join(encoded);

        // Arm the directory watcher before snapshotting so a file landing
        // in between still produces a change event.
        let (change_tx, mut change_rx) = mpsc::channel::<()>(32);
        let watcher_guard = create_dir_watcher(&dir, change_tx)?;
        let snapshot = session_ids_in(&dir);
        debug!(
            real_path = %real_path.display(),
            existing = snapshot.len(),
            "new-session detector armed"
        );

        let real_path = real_path.to_path_buf();
        tokio::spawn(async move {
            let _watcher_guard = watcher_guard;
            loop {
                tokio::select! {
                    changed = change_rx.recv() => {
                        if changed.is_none() {
                            warn!(real_path = %real_path.display(), "detector channel closed");
                            break;
                        }
                        let current = session_ids_in(&dir);
                        if let Some(session_id) =
                            current.difference(&snapshot).min().cloned()
                        {
                            let detected = DetectedSession {
                                session_id: SessionId::new(session_id),
                                real_path: real_path.clone(),
                                cli_client_id,
                            };
                            let _ = tx.send(detected).await;
                            break;
                        }
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        });
        Ok(())
    }

    /// Non-blocking probe: the newest session transcript created within the
    /// last minute, if any.
    pub fn find_recent(&self, real_path: &Path) -> Option<SessionId> {
        let encoded = self.path_map.resolve_or_refresh(real_path)?;
        let dir = self.root.join(encoded);
        let now = SystemTime::now();
        std::fs::read_dir(dir)
            .ok()?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                let session_id = SessionId::from_transcript_name(&name)?;
                let mtime = e.metadata().ok()?.modified().ok()?;
                let age = now.duration_since(mtime).unwrap_or_default();
                (age < FIND_WINDOW).then_some((mtime, session_id))
            })
            .max_by_key(|(mtime, _)| *mtime)
            .map(|(_, session_id)| session_id)
    }
}

fn session_ids_in(dir: &Path) -> HashSet<String> {
    let Ok(read) = std::fs::read_dir(dir) else { return HashSet::new() };
    read.filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            SessionId::from_transcript_name(&name).map(|sid| sid.0)
        })
        .collect()
}

fn create_dir_watcher(
    dir: &Path,
    tx: mpsc::Sender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.blocking_send(());
        }
    })?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
