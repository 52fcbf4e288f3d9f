// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Identifier newtypes for sessions, connections, and approval requests.
//!
//! A `SessionId` is the UUID the assistant picked for a conversation; it is
//! also the transcript's filename stem. `ClientId` identifies one WebSocket
//! connection at the hub. `RequestId` identifies one approval round-trip.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique identifier for an assistant session.
///
/// The value is assigned by the assistant itself; the coordinator only ever
/// learns it (from the launcher's UUID pipe or from a transcript filename)
/// and never invents one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create a new SessionId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this SessionId.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a transcript filename (`<uuid>.jsonl`) into a SessionId.
    ///
    /// Returns `None` for agent-subordinate files (`agent-*.jsonl`), files
    /// without the `.jsonl` extension, and stems that are not valid UUIDs.
    pub fn from_transcript_name(name: &str) -> Option<Self> {
        if name.starts_with("agent-") {
            return None;
        }
        let stem = name.strip_suffix(".jsonl")?;
        uuid::Uuid::parse_str(stem).ok()?;
        Some(Self(stem.to_string()))
    }

    /// The transcript filename for this session.
    pub fn transcript_name(&self) -> String {
        format!("{}.jsonl", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of one WebSocket connection at the hub.
///
/// Assigned by the hub when the connection is accepted; never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh connection identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one tool-approval round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
