// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Read-only helpers over the transcript tree.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use vlaude_core::{path, ProjectMeta, SessionId, SessionMeta, SortOrder, TranscriptRecord};

use crate::path_map::PathMap;

/// A transcript modified within this window counts as loading.
pub const LOADING_WINDOW: Duration = Duration::from_secs(5);

/// Errors from store reads.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no store directory maps to {}", .0.display())]
    UnknownProject(PathBuf),

    #[error("no transcript for session {0}")]
    UnknownSession(SessionId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of a paginated message read.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePage {
    pub messages: Vec<Value>,
    pub total: usize,
    pub has_more: bool,
}

/// Read-only view over the on-disk session store.
///
/// All operations translate `real_path` through the [`PathMap`]; a missing
/// mapping is a terminal not-found. The store never writes a transcript.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    root: PathBuf,
    path_map: Arc<PathMap>,
}

impl TranscriptStore {
    pub fn new(root: impl Into<PathBuf>, path_map: Arc<PathMap>) -> Self {
        Self { root: root.into(), path_map }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_map(&self) -> &Arc<PathMap> {
        &self.path_map
    }

    /// The transcript path for a session, verifying it exists.
    pub fn session_file(
        &self,
        session_id: &SessionId,
        real_path: &Path,
    ) -> Result<PathBuf, StoreError> {
        let encoded = self
            .path_map
            .resolve_or_refresh(real_path)
            .ok_or_else(|| StoreError::UnknownProject(real_path.to_path_buf()))?;
        let file = self.root.join(encoded).join(session_id.transcript_name());
        if !file.is_file() {
            return Err(StoreError::UnknownSession(session_id.clone()));
        }
        Ok(file)
    }

    /// All known projects, sorted by most recent transcript activity.
    pub fn list_projects(&self, limit: Option<usize>) -> Vec<ProjectMeta> {
        let mut projects: Vec<ProjectMeta> = self
            .path_map
            .snapshot()
            .into_iter()
            .filter_map(|(real_path, encoded)| self.project_meta(&real_path, encoded))
            .collect();
        projects.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        if let Some(limit) = limit {
            projects.truncate(limit);
        }
        projects
    }

    /// Look up one project by its encoded directory name.
    pub fn project_by_encoded(&self, encoded: &str) -> Option<ProjectMeta> {
        let (real_path, encoded) =
            self.path_map.snapshot().into_iter().find(|(_, e)| e.as_str() == encoded)?;
        self.project_meta(&real_path, encoded)
    }

    fn project_meta(&self, real_path: &Path, encoded: String) -> Option<ProjectMeta> {
        let dir = self.root.join(&encoded);
        let read = std::fs::read_dir(&dir).ok()?;
        let mut last_accessed: Option<DateTime<Utc>> = None;
        let mut session_count = 0;
        for entry in read.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if SessionId::from_transcript_name(&name).is_none() {
                continue;
            }
            session_count += 1;
            if let Some(mtime) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
                let mtime: DateTime<Utc> = mtime.into();
                last_accessed = Some(last_accessed.map_or(mtime, |t| t.max(mtime)));
            }
        }
        Some(ProjectMeta {
            name: path::project_name(real_path),
            real_path: real_path.to_path_buf(),
            encoded_dir_name: encoded,
            last_accessed,
            session_count,
        })
    }

    /// Sessions of one project, most recently updated first.
    ///
    /// Transcripts whose only line is a summary record are bookkeeping for
    /// the assistant's compaction and are not user-visible sessions.
    pub fn list_sessions(
        &self,
        real_path: &Path,
        limit: Option<usize>,
    ) -> Result<Vec<SessionMeta>, StoreError> {
        let encoded = self
            .path_map
            .resolve_or_refresh(real_path)
            .ok_or_else(|| StoreError::UnknownProject(real_path.to_path_buf()))?;
        let dir = self.root.join(encoded);
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&dir)?.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(session_id) = SessionId::from_transcript_name(&name) else { continue };
            let records = read_records(&entry.path());
            if is_summary_only(&records) {
                continue;
            }
            let metadata = entry.metadata().ok();
            sessions.push(SessionMeta {
                session_id,
                real_path: real_path.to_path_buf(),
                created_at: metadata.as_ref().and_then(|m| m.created().ok()).map(Into::into),
                last_updated: metadata.as_ref().and_then(|m| m.modified().ok()).map(Into::into),
                message_count: records.iter().filter(|r| !r.is_internal()).count(),
            });
        }
        sessions.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    /// Metadata for one session.
    pub fn session_meta(
        &self,
        session_id: &SessionId,
        real_path: &Path,
    ) -> Result<SessionMeta, StoreError> {
        let file = self.session_file(session_id, real_path)?;
        let records = read_records(&file);
        let metadata = std::fs::metadata(&file).ok();
        Ok(SessionMeta {
            session_id: session_id.clone(),
            real_path: real_path.to_path_buf(),
            created_at: metadata.as_ref().and_then(|m| m.created().ok()).map(Into::into),
            last_updated: metadata.as_ref().and_then(|m| m.modified().ok()).map(Into::into),
            message_count: records.iter().filter(|r| !r.is_internal()).count(),
        })
    }

    /// Locate a session by id alone, scanning known projects.
    pub fn find_session(&self, session_id: &SessionId) -> Option<SessionMeta> {
        for (real_path, encoded) in self.path_map.snapshot() {
            if self.root.join(&encoded).join(session_id.transcript_name()).is_file() {
                return self.session_meta(session_id, &real_path).ok();
            }
        }
        None
    }

    /// Paginated message read.
    ///
    /// Unparseable lines (including a torn final line) and internal record
    /// types are dropped before slicing. `Desc` slices over the reversed
    /// natural order.
    pub fn read_messages(
        &self,
        session_id: &SessionId,
        real_path: &Path,
        limit: usize,
        offset: usize,
        order: SortOrder,
    ) -> Result<MessagePage, StoreError> {
        let file = self.session_file(session_id, real_path)?;
        let mut records: Vec<TranscriptRecord> =
            read_records(&file).into_iter().filter(|r| !r.is_internal()).collect();
        if order == SortOrder::Desc {
            records.reverse();
        }
        let total = records.len();
        let messages: Vec<Value> = records
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(TranscriptRecord::into_value)
            .collect();
        let has_more = offset + messages.len() < total;
        Ok(MessagePage { messages, total, has_more })
    }

    /// The most recent deliverable record, if any.
    pub fn last_message(
        &self,
        session_id: &SessionId,
        real_path: &Path,
    ) -> Result<Option<TranscriptRecord>, StoreError> {
        let file = self.session_file(session_id, real_path)?;
        Ok(read_records(&file).into_iter().rev().find(|r| !r.is_internal()))
    }

    /// All records of a session in file order (internal types included).
    pub fn records(
        &self,
        session_id: &SessionId,
        real_path: &Path,
    ) -> Result<Vec<TranscriptRecord>, StoreError> {
        let file = self.session_file(session_id, real_path)?;
        Ok(read_records(&file))
    }

    /// Whether the assistant is mid-generation on this session.
    ///
    /// Advisory heuristic: the transcript was modified within
    /// [`LOADING_WINDOW`], or the most recent assistant record has no
    /// completion stamp yet.
    pub fn is_loading(&self, session_id: &SessionId, real_path: &Path) -> Result<bool, StoreError> {
        let file = self.session_file(session_id, real_path)?;
        if let Ok(mtime) = std::fs::metadata(&file).and_then(|m| m.modified()) {
            let age = SystemTime::now().duration_since(mtime).unwrap_or_default();
            if age < LOADING_WINDOW {
                return Ok(true);
            }
        }
        let records = read_records(&file);
        let last_assistant = records.iter().rev().find(|r| r.is_assistant());
        Ok(last_assistant.is_some_and(|r| r.completed_at().is_none()))
    }
}

/// Parse a transcript file, dropping blank, torn, and non-object lines.
fn read_records(file: &Path) -> Vec<TranscriptRecord> {
    let Ok(open) = File::open(file) else { return Vec::new() };
    BufReader::new(open)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| TranscriptRecord::parse(&line))
        .collect()
}

fn is_summary_only(records: &[TranscriptRecord]) -> bool {
    matches!(records, [only] if only.is_summary())
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
