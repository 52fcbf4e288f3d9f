// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Connection classification at the hub.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of peer a WebSocket connection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// The terminal wrapper owning the local assistant process.
    Cli,
    /// A remote mobile viewer/driver.
    Mobile,
    /// The per-host sidecar's internal uplink. Trusted, bypasses JWT.
    Daemon,
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClientType::Cli => "cli",
            ClientType::Mobile => "mobile",
            ClientType::Daemon => "daemon",
        };
        write!(f, "{s}")
    }
}
