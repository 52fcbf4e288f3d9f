// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: VLAUDE_STATE_DIR > XDG_STATE_HOME/vlaude > ~/.local/state/vlaude
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("VLAUDE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("vlaude"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/vlaude"))
}

/// Resolve the transcript store root.
///
/// `VLAUDE_STORE_DIR` wins, then the assistant's own config dir override
/// (`CLAUDE_CONFIG_DIR`), then `~/.claude/projects`.
pub fn store_root() -> PathBuf {
    if let Ok(dir) = std::env::var("VLAUDE_STORE_DIR") {
        return PathBuf::from(dir);
    }
    let base = std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".claude"));
    base.join("projects")
}

/// HTTP listen address for the server-facing API. Loopback by default; the
/// daemon trusts its peer and performs no authentication itself.
pub fn http_addr() -> String {
    std::env::var("VLAUDE_DAEMON_ADDR").unwrap_or_else(|_| "127.0.0.1:8787".to_string())
}

/// WebSocket URL of the hub's `/ws` endpoint for the uplink.
pub fn hub_url() -> String {
    std::env::var("VLAUDE_HUB_URL").unwrap_or_else(|_| "ws://127.0.0.1:8790/ws".to_string())
}

/// Assistant command line for remote-mode delivery, whitespace-separated.
pub fn assistant_cmd() -> Vec<String> {
    std::env::var("VLAUDE_ASSISTANT_CMD")
        .unwrap_or_else(|_| "claude".to_string())
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Deadline for tool-approval round-trips.
pub fn approval_timeout() -> Duration {
    std::env::var("VLAUDE_APPROVAL_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

/// Host label reported on the uplink hello.
pub fn host_name() -> String {
    std::env::var("VLAUDE_HOST_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}
