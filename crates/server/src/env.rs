// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Centralized environment variable access for the server crate.

use std::path::PathBuf;

/// Resolve state directory: VLAUDE_STATE_DIR > XDG_STATE_HOME/vlaude > ~/.local/state/vlaude
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("VLAUDE_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("vlaude"));
    }
    std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".local/state/vlaude"))
}

/// Bind address for the hub (REST + `/ws`). TLS terminates in front of it.
pub fn bind_addr() -> String {
    std::env::var("VLAUDE_HUB_ADDR").unwrap_or_else(|_| "127.0.0.1:8790".to_string())
}

/// Base URL of the daemon's HTTP API.
pub fn daemon_base() -> String {
    std::env::var("VLAUDE_DAEMON_BASE").unwrap_or_else(|_| "http://127.0.0.1:8787".to_string())
}

/// PEM file with the RS256 public key used to validate client tokens.
pub fn jwt_public_key_path() -> Option<PathBuf> {
    std::env::var("VLAUDE_JWT_PUBKEY").ok().map(PathBuf::from)
}

/// PEM file with the RS256 private key used by `/auth/generate-token`.
/// Absent on hubs that only validate externally provisioned tokens.
pub fn jwt_private_key_path() -> Option<PathBuf> {
    std::env::var("VLAUDE_JWT_PRIVKEY").ok().map(PathBuf::from)
}

/// Comma-separated CIDRs exempt from token auth (internal daemon,
/// localhost CLI).
pub fn trusted_cidrs() -> Vec<String> {
    std::env::var("VLAUDE_TRUSTED_CIDRS")
        .unwrap_or_else(|_| "127.0.0.0/8,::1/128".to_string())
        .split(',')
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
        .collect()
}
