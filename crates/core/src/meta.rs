// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Project and session metadata as exposed over the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::id::SessionId;

/// Metadata for one project in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    /// Absolute path of the project on the daemon's host.
    pub real_path: PathBuf,
    /// Last path segment, for display.
    pub name: String,
    /// Store directory name (lossy encoding of `real_path`).
    pub encoded_dir_name: String,
    /// Max mtime over the project's transcripts.
    pub last_accessed: Option<DateTime<Utc>>,
    pub session_count: usize,
}

/// Metadata for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub session_id: SessionId,
    pub real_path: PathBuf,
    /// Transcript file birthtime where the filesystem reports one.
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Transcript line count excluding internal record types.
    pub message_count: usize,
}

/// Slice direction for paginated message reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}
