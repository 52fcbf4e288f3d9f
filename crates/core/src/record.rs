// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! One transcript record: a single JSONL line of a session file.
//!
//! The coordinator treats message content as opaque. A record is kept as its
//! raw JSON value and propagated whole; only the handful of fields the core
//! routes on (type, uuid, timestamp, sidechain/error flags, usage, cwd) get
//! typed accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record types that exist for the assistant's own bookkeeping and are
/// filtered out before delivery to clients.
pub const INTERNAL_TYPES: &[&str] =
    &["queue-operation", "checkpoint", "file-history-snapshot", "summary"];

/// A single parsed transcript line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranscriptRecord(Value);

impl TranscriptRecord {
    /// Parse one JSONL line. Returns `None` for blank lines and lines that
    /// are not a JSON object (including the torn final line of a file the
    /// assistant is mid-append on).
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let value: Value = serde_json::from_str(trimmed).ok()?;
        value.is_object().then(|| Self(value))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The record's `type` field.
    pub fn record_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Whether this record is internal bookkeeping (never delivered).
    pub fn is_internal(&self) -> bool {
        self.record_type().is_some_and(|t| INTERNAL_TYPES.contains(&t))
    }

    pub fn is_assistant(&self) -> bool {
        self.record_type() == Some("assistant")
    }

    pub fn is_summary(&self) -> bool {
        self.record_type() == Some("summary")
    }

    pub fn uuid(&self) -> Option<&str> {
        self.0.get("uuid").and_then(Value::as_str)
    }

    /// The record's ISO-8601 `timestamp`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.get("timestamp").and_then(Value::as_str)?;
        DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
    }

    pub fn is_sidechain(&self) -> bool {
        self.0.get("isSidechain").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_api_error(&self) -> bool {
        self.0.get("isApiErrorMessage").and_then(Value::as_bool).unwrap_or(false)
    }

    /// The completion timestamp an assistant record gains once its
    /// generation finished. A missing stamp on the latest assistant record
    /// means the assistant is still streaming.
    pub fn completed_at(&self) -> Option<&str> {
        self.0
            .get("completedAt")
            .or_else(|| self.0.get("message").and_then(|m| m.get("completedAt")))
            .and_then(Value::as_str)
    }

    /// The working directory recorded at session start. Authoritative source
    /// for the encoded-directory → real-path mapping.
    pub fn cwd(&self) -> Option<&str> {
        self.0.get("cwd").and_then(Value::as_str)
    }

    /// Token usage attached to the record, if any.
    pub fn usage(&self) -> Option<Usage> {
        let usage = self.0.get("message")?.get("usage")?;
        let field = |name: &str| usage.get(name).and_then(Value::as_u64).unwrap_or(0);
        Some(Usage {
            input_tokens: field("input_tokens"),
            output_tokens: field("output_tokens"),
            cache_read_input_tokens: field("cache_read_input_tokens"),
            cache_creation_input_tokens: field("cache_creation_input_tokens"),
        })
    }
}

/// Token usage of one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
}

impl Usage {
    /// The context occupied after this record: fresh input plus everything
    /// read from or written to the prompt cache.
    pub fn context_length(&self) -> u64 {
        self.input_tokens + self.cache_read_input_tokens + self.cache_creation_input_tokens
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
