// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Per-session local/remote mode arbitration.
//!
//! Pure state; side effects (remote-connect emission, loading probes,
//! watcher pause/resume) live in the dispatch layer. A session nobody has
//! touched is Local.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;
use vlaude_core::{Mode, SessionId};

/// Verdict of a graceful-exit request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitVerdict {
    Allowed,
    /// The assistant is mid-generation; the CLI stays passive.
    Denied { reason: String },
}

/// Per-session mode registry.
#[derive(Default)]
pub struct ModeArbiter {
    modes: Mutex<HashMap<SessionId, Mode>>,
}

impl ModeArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self, session_id: &SessionId) -> Mode {
        self.modes.lock().get(session_id).copied().unwrap_or_default()
    }

    /// A mobile joined: the session is remote-driven.
    pub fn set_remote(&self, session_id: &SessionId) -> Mode {
        let previous =
            self.modes.lock().insert(session_id.clone(), Mode::Remote).unwrap_or_default();
        debug!(%session_id, ?previous, "mode -> remote");
        previous
    }

    /// The last mobile left: the CLI may drive again.
    pub fn set_local(&self, session_id: &SessionId) -> Mode {
        let previous =
            self.modes.lock().insert(session_id.clone(), Mode::Local).unwrap_or_default();
        debug!(%session_id, ?previous, "mode -> local");
        previous
    }

    /// Mark the graceful-exit probe in flight.
    pub fn begin_transition(&self, session_id: &SessionId) {
        self.modes.lock().insert(session_id.clone(), Mode::Transitioning);
    }

    /// Settle the probe: allowed lands Local, denied returns Remote.
    pub fn settle_exit(&self, session_id: &SessionId, loading: bool) -> ExitVerdict {
        let mut modes = self.modes.lock();
        if loading {
            modes.insert(session_id.clone(), Mode::Remote);
            ExitVerdict::Denied { reason: "loading".to_string() }
        } else {
            modes.insert(session_id.clone(), Mode::Local);
            ExitVerdict::Allowed
        }
    }

    /// Forget a session that no longer has occupancy.
    pub fn forget(&self, session_id: &SessionId) {
        self.modes.lock().remove(session_id);
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
