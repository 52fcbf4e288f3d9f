// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Cache of real-project-path → encoded-store-directory mappings.
//!
//! The encoding is lossy, so the cache is built in the authoritative
//! direction: by reading the `cwd` field a transcript records near its head.
//! An encoded name produced from a real path is only ever a guess until a
//! `cwd` line corroborates it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, warn};
use vlaude_core::{path, SessionId, TranscriptRecord};

/// How young a file must be for a cwd-less candidate directory to count as
/// freshly created (the window between directory creation and the first
/// usable transcript line).
pub const FRESH_DIR_WINDOW: Duration = Duration::from_secs(60);

/// How many head lines of a transcript to scan for a `cwd` field.
const HEAD_SCAN_LINES: usize = 25;

/// Bidirectional path cache, preloaded by scanning the store at startup.
///
/// Process-local and never persisted. Lookups are O(1) after preload;
/// `refresh` is bounded by the ASCII prefix filter.
#[derive(Debug)]
pub struct PathMap {
    root: PathBuf,
    entries: Mutex<HashMap<PathBuf, String>>,
}

impl PathMap {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), entries: Mutex::new(HashMap::new()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan every store directory and learn mappings from `cwd` lines.
    ///
    /// Directories whose transcripts carry no `cwd` are skipped; they become
    /// resolvable later through [`PathMap::refresh`].
    pub fn preload(&self) -> usize {
        let Ok(read) = std::fs::read_dir(&self.root) else {
            debug!(root = %self.root.display(), "store root missing, preload skipped");
            return 0;
        };
        let mut learned = 0;
        for entry in read.filter_map(|e| e.ok()) {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(real_path) = first_cwd_in(&entry.path()) {
                self.entries.lock().insert(real_path, name);
                learned += 1;
            }
        }
        debug!(learned, "path map preloaded");
        learned
    }

    /// Cached lookup only.
    pub fn resolve(&self, real_path: &Path) -> Option<String> {
        self.entries.lock().get(real_path).cloned()
    }

    /// Cached lookup, falling back to a scoped directory scan on miss.
    pub fn resolve_or_refresh(&self, real_path: &Path) -> Option<String> {
        self.resolve(real_path).or_else(|| self.refresh(real_path))
    }

    /// Record an authoritative mapping (a `cwd` line was observed).
    pub fn learn(&self, real_path: impl Into<PathBuf>, encoded: impl Into<String>) {
        self.entries.lock().insert(real_path.into(), encoded.into());
    }

    /// Scoped re-scan for one real path.
    ///
    /// Validates any cached entry by stat first, evicting a mapping whose
    /// directory has vanished. Then walks store directories that survive the
    /// ASCII prefix filter, preferring an exact `cwd` match and falling back
    /// to a freshly-created directory that ends in the project's basename.
    pub fn refresh(&self, real_path: &Path) -> Option<String> {
        {
            let mut entries = self.entries.lock();
            if let Some(encoded) = entries.get(real_path) {
                if self.root.join(encoded).is_dir() {
                    return Some(encoded.clone());
                }
                debug!(real_path = %real_path.display(), encoded, "evicting vanished mapping");
                entries.remove(real_path);
            }
        }

        let prefix = path::ascii_prefix(real_path);
        let basename = path::project_name(real_path);
        let read = match std::fs::read_dir(&self.root) {
            Ok(read) => read,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "store root unreadable");
                return None;
            }
        };

        let mut fresh_fallback: Option<String> = None;
        for entry in read.filter_map(|e| e.ok()) {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) {
                continue;
            }
            match first_cwd_in(&dir) {
                Some(cwd) => {
                    let matched = cwd == real_path;
                    // Authoritative either way — cache what the cwd says.
                    self.entries.lock().insert(cwd, name.clone());
                    if matched {
                        return Some(name);
                    }
                }
                None => {
                    if fresh_fallback.is_none()
                        && name.ends_with(basename.as_str())
                        && has_file_younger_than(&dir, FRESH_DIR_WINDOW)
                    {
                        fresh_fallback = Some(name);
                    }
                }
            }
        }

        if let Some(name) = fresh_fallback {
            debug!(real_path = %real_path.display(), encoded = %name, "fresh directory fallback");
            self.entries.lock().insert(real_path.to_path_buf(), name.clone());
            return Some(name);
        }
        None
    }

    /// Produce (and cache) an encoded name for a never-seen project,
    /// creating the store directory if absent.
    ///
    /// Only the new-session detector takes this path; every other caller
    /// must treat an unresolvable path as not-found.
    pub fn synthesize(&self, real_path: &Path) -> std::io::Result<String> {
        let encoded = path::encode(real_path);
        std::fs::create_dir_all(self.root.join(&encoded))?;
        self.entries.lock().insert(real_path.to_path_buf(), encoded.clone());
        Ok(encoded)
    }

    /// Snapshot of all known mappings.
    pub fn snapshot(&self) -> Vec<(PathBuf, String)> {
        self.entries.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// The real path recorded by the first transcript in `dir` whose head
/// carries a `cwd` field.
fn first_cwd_in(dir: &Path) -> Option<PathBuf> {
    let read = std::fs::read_dir(dir).ok()?;
    for entry in read.filter_map(|e| e.ok()) {
        let file = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if SessionId::from_transcript_name(&name).is_none() {
            continue;
        }
        let Ok(open) = File::open(&file) else { continue };
        let reader = BufReader::new(open);
        for line in reader.lines().map_while(Result::ok).take(HEAD_SCAN_LINES) {
            let Some(record) = TranscriptRecord::parse(&line) else { continue };
            if let Some(cwd) = record.cwd() {
                return Some(PathBuf::from(cwd));
            }
        }
    }
    None
}

/// Whether `dir` contains any file modified within `window`.
fn has_file_younger_than(dir: &Path, window: Duration) -> bool {
    let Ok(read) = std::fs::read_dir(dir) else { return false };
    let now = SystemTime::now();
    read.filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter_map(|m| m.modified().ok())
        .any(|mtime| now.duration_since(mtime).map(|age| age < window).unwrap_or(true))
}

#[cfg(test)]
#[path = "path_map_tests.rs"]
mod tests;
