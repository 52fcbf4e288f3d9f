// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Lossy encoding between real project paths and store directory names.
//!
//! The store names each project directory `'-' + path-without-leading-slash`
//! with every `/` replaced by `-`. The transform loses information (real
//! dashes are indistinguishable from separators, non-ASCII bytes collide),
//! so the encoded name is only ever a guess; the authoritative direction is
//! learned from a transcript's `cwd` field and cached in the PathMap.

use std::path::{Path, PathBuf};

/// Encode a real project path into its store directory name.
pub fn encode(real_path: &Path) -> String {
    let s = real_path.to_string_lossy();
    format!("-{}", s.trim_start_matches('/').replace('/', "-"))
}

/// Invert [`encode`] for all-ASCII names.
///
/// Only a guess: a `-` inside a path segment decodes as a separator. Callers
/// must treat the result as provisional until corroborated by a `cwd` line.
pub fn decode(encoded: &str) -> Option<PathBuf> {
    let rest = encoded.strip_prefix('-')?;
    Some(PathBuf::from(format!("/{}", rest.replace('-', "/"))))
}

/// The encoded prefix of `real_path` up to (excluding) its first non-ASCII
/// character.
///
/// Candidate store directories whose names do not start with this prefix
/// cannot encode `real_path`, which keeps refresh scans cheap.
pub fn ascii_prefix(real_path: &Path) -> String {
    let s = real_path.to_string_lossy();
    let ascii: String = s.chars().take_while(char::is_ascii).collect();
    format!("-{}", ascii.trim_start_matches('/').replace('/', "-"))
}

/// The display name of a project: its last path segment.
pub fn project_name(real_path: &Path) -> String {
    real_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| real_path.to_string_lossy().into_owned())
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
