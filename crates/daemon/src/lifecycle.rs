// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Daemon lifecycle: configuration, single-instance lock, startup.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use thiserror::Error;
use tracing::info;
use vlaude_store::{NewSessionDetector, PathMap, TranscriptStore, TranscriptWatcher, WatchEvent};

use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/vlaude)
    pub state_dir: PathBuf,
    /// Transcript store root (e.g. ~/.claude/projects)
    pub store_root: PathBuf,
    /// HTTP listen address for the server-facing API
    pub http_addr: String,
    /// Hub WebSocket URL for the uplink
    pub hub_url: String,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// One daemon serves all projects of a user on this host.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            store_root: env::store_root(),
            http_addr: env::http_addr(),
            hub_url: env::hub_url(),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
        })
    }
}

/// Errors during startup
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no usable state directory (HOME unset)")]
    NoStateDir,

    #[error("another daemon holds the lock: {0}")]
    LockFailed(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handles produced by startup.
#[derive(Debug)]
pub struct StartupResult {
    pub store: TranscriptStore,
    pub path_map: Arc<PathMap>,
    pub watcher: Arc<TranscriptWatcher>,
    pub detector: Arc<NewSessionDetector>,
    pub watch_rx: tokio::sync::mpsc::Receiver<WatchEvent>,
    /// Held for the process lifetime; dropping releases the PID lock.
    pub lock_file: std::fs::File,
}

/// Acquire the instance lock, write bookkeeping files, and preload the
/// store view.
pub fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock first. Open without truncating so a losing race does not wipe
    // the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    let path_map = Arc::new(PathMap::new(&config.store_root));
    let learned = path_map.preload();
    info!(
        store_root = %config.store_root.display(),
        projects = learned,
        "path map preloaded"
    );

    let store = TranscriptStore::new(&config.store_root, Arc::clone(&path_map));
    let (watch_tx, watch_rx) = tokio::sync::mpsc::channel(256);
    let watcher = Arc::new(TranscriptWatcher::new(store.clone(), watch_tx));
    let detector = Arc::new(NewSessionDetector::new(&config.store_root, Arc::clone(&path_map)));

    Ok(StartupResult { store, path_map, watcher, detector, watch_rx, lock_file })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
