// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! vlaude-store: read-only view over the on-disk session store.
//!
//! The store root holds one directory per project (named by the lossy path
//! encoding) containing one append-only JSONL transcript per session. Only
//! the assistant writes transcripts; everything here reads, watches, and
//! maps paths.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod detector;
mod path_map;
mod transcript;
mod watcher;

pub use detector::{DetectedSession, DetectorError, NewSessionDetector};
pub use path_map::{PathMap, FRESH_DIR_WINDOW};
pub use transcript::{MessagePage, StoreError, TranscriptStore, LOADING_WINDOW};
pub use watcher::{TranscriptWatcher, WatchEvent};
