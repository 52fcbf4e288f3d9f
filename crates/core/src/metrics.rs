// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Session-level usage metrics derived from a transcript.

use serde::{Deserialize, Serialize};

use crate::record::TranscriptRecord;

/// Assumed model context window, used to express context occupancy as a
/// percentage for the status line.
pub const CONTEXT_WINDOW: u64 = 200_000;

/// Cumulative token usage plus current context occupancy for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub context_length: u64,
    pub context_percentage: f64,
}

impl SessionMetrics {
    /// Derive metrics from transcript records in file order.
    ///
    /// Input/output tokens accumulate over every record carrying usage.
    /// Context length comes from the most recent main-chain record: the last
    /// one that is neither a sidechain nor an API error.
    pub fn derive<'a>(records: impl IntoIterator<Item = &'a TranscriptRecord>) -> Self {
        let mut metrics = Self::default();
        for record in records {
            let Some(usage) = record.usage() else { continue };
            metrics.input_tokens += usage.input_tokens;
            metrics.output_tokens += usage.output_tokens;
            if !record.is_sidechain() && !record.is_api_error() {
                metrics.context_length = usage.context_length();
            }
        }
        metrics.context_percentage =
            (metrics.context_length as f64 / CONTEXT_WINDOW as f64 * 100.0).min(100.0);
        metrics
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
