// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Session subscription registry.
//!
//! Maps sessions to subscriber connections and reports the 0↔1 edges the
//! dispatch layer turns into daemon watch acquire/release calls. Subscriber
//! lists keep subscription order, so the most recent subscriber is the tail
//! (the approval-target fallback).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;
use vlaude_core::{ClientId, SessionId};

struct SubEntry {
    real_path: PathBuf,
    /// Subscription order; most recent last.
    ids: Vec<ClientId>,
}

/// Per-session subscriber sets.
#[derive(Default)]
pub struct SubscriptionRouter {
    subs: Mutex<HashMap<SessionId, SubEntry>>,
}

impl SubscriptionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. True when this was the 0→1 edge (the caller
    /// acquires the daemon-side watcher).
    pub fn subscribe(
        &self,
        session_id: &SessionId,
        real_path: &Path,
        client_id: &ClientId,
    ) -> bool {
        let mut subs = self.subs.lock();
        let entry = subs.entry(session_id.clone()).or_insert_with(|| SubEntry {
            real_path: real_path.to_path_buf(),
            ids: Vec::new(),
        });
        let first = entry.ids.is_empty();
        entry.ids.retain(|id| id != client_id);
        entry.ids.push(client_id.clone());
        debug!(%session_id, %client_id, first, "subscribed");
        first
    }

    /// Remove a subscriber. True when this was the 1→0 edge (the caller
    /// releases the daemon-side watcher).
    pub fn unsubscribe(&self, session_id: &SessionId, client_id: &ClientId) -> bool {
        let mut subs = self.subs.lock();
        let Some(entry) = subs.get_mut(session_id) else { return false };
        let had = !entry.ids.is_empty();
        entry.ids.retain(|id| id != client_id);
        let last = had && entry.ids.is_empty();
        if entry.ids.is_empty() {
            subs.remove(session_id);
        }
        last
    }

    /// Drop a disconnecting client everywhere; returns each session where it
    /// was the last subscriber, with the session's project path.
    pub fn unsubscribe_all(&self, client_id: &ClientId) -> Vec<(SessionId, PathBuf)> {
        let mut released = Vec::new();
        let mut subs = self.subs.lock();
        subs.retain(|session_id, entry| {
            let had = entry.ids.iter().any(|id| id == client_id);
            entry.ids.retain(|id| id != client_id);
            if had && entry.ids.is_empty() {
                released.push((session_id.clone(), entry.real_path.clone()));
                return false;
            }
            true
        });
        released
    }

    pub fn subscribers(&self, session_id: &SessionId) -> Vec<ClientId> {
        self.subs.lock().get(session_id).map(|e| e.ids.clone()).unwrap_or_default()
    }

    /// The most recent subscriber of a session.
    pub fn most_recent(&self, session_id: &SessionId) -> Option<ClientId> {
        self.subs.lock().get(session_id).and_then(|e| e.ids.last().cloned())
    }

    pub fn real_path_of(&self, session_id: &SessionId) -> Option<PathBuf> {
        self.subs.lock().get(session_id).map(|e| e.real_path.clone())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
