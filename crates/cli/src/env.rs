// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Centralized environment variable access for the CLI.

use std::path::PathBuf;

/// WebSocket URL of the hub's control endpoint.
pub fn hub_url() -> String {
    std::env::var("VLAUDE_HUB_URL").unwrap_or_else(|_| "ws://127.0.0.1:8790/ws".to_string())
}

/// Assistant command line, whitespace-separated.
pub fn assistant_cmd() -> Vec<String> {
    std::env::var("VLAUDE_ASSISTANT_CMD")
        .unwrap_or_else(|_| "claude".to_string())
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// State directory shared with the daemon (pid/log files for `vlaude daemon`).
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("VLAUDE_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("vlaude"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/vlaude"))
}

/// Env var the launcher reads to find the UUID side-channel pipe.
pub const UUID_PIPE_ENV: &str = "VLAUDE_UUID_PIPE";
