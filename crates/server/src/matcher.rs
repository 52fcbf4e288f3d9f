// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! The UUID matching protocol.
//!
//! A freshly launched assistant picks its session UUID internally. The CLI
//! reports every UUID its launcher observes; the daemon reports every new
//! transcript it sees. Neither observation alone is trustworthy — their
//! intersection is. State lives per project path, created on the first
//! signal and deleted on match, so a CLI restart inherits the daemon-side
//! observations that already arrived.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};
use vlaude_core::{ClientId, SessionId};

struct MatchState {
    uuids_reported_by_cli: HashSet<String>,
    session_ids_seen_by_daemon: HashSet<String>,
    cli_client_id: Option<ClientId>,
}

/// A confirmed session identity, addressed to the reporting CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub session_id: SessionId,
    pub cli_client_id: Option<ClientId>,
}

/// Correlates CLI-reported UUIDs with daemon-observed session ids.
#[derive(Default)]
pub struct UuidMatcher {
    states: Mutex<HashMap<PathBuf, MatchState>>,
}

impl UuidMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a UUID from the CLI's launcher pipe. Returns the confirmation
    /// when this UUID was already seen by the daemon.
    pub fn report_cli_uuid(
        &self,
        real_path: &Path,
        uuid: &str,
        cli_client_id: &ClientId,
    ) -> Option<Confirmation> {
        let mut states = self.states.lock();
        let state = states.entry(real_path.to_path_buf()).or_insert_with(|| MatchState {
            uuids_reported_by_cli: HashSet::new(),
            session_ids_seen_by_daemon: HashSet::new(),
            cli_client_id: None,
        });
        // Latest reporter wins: handles a CLI restart on the same project.
        state.cli_client_id = Some(cli_client_id.clone());
        state.uuids_reported_by_cli.insert(uuid.to_string());
        debug!(real_path = %real_path.display(), uuid, "cli uuid reported");

        if state.session_ids_seen_by_daemon.contains(uuid) {
            let confirmation = Confirmation {
                session_id: SessionId::new(uuid),
                cli_client_id: state.cli_client_id.clone(),
            };
            states.remove(real_path);
            info!(real_path = %real_path.display(), uuid, "session confirmed");
            return Some(confirmation);
        }
        None
    }

    /// Record a transcript the daemon just observed. Returns the
    /// confirmation when the CLI already reported this UUID.
    pub fn report_daemon_session(
        &self,
        real_path: &Path,
        session_id: &SessionId,
    ) -> Option<Confirmation> {
        let mut states = self.states.lock();
        let state = states.entry(real_path.to_path_buf()).or_insert_with(|| MatchState {
            uuids_reported_by_cli: HashSet::new(),
            session_ids_seen_by_daemon: HashSet::new(),
            cli_client_id: None,
        });
        state.session_ids_seen_by_daemon.insert(session_id.as_str().to_string());
        debug!(real_path = %real_path.display(), %session_id, "daemon session reported");

        if state.uuids_reported_by_cli.contains(session_id.as_str()) {
            let confirmation = Confirmation {
                session_id: session_id.clone(),
                cli_client_id: state.cli_client_id.clone(),
            };
            states.remove(real_path);
            info!(real_path = %real_path.display(), %session_id, "session confirmed");
            return Some(confirmation);
        }
        None
    }

    /// Number of projects with matching in progress.
    pub fn open_states(&self) -> usize {
        self.states.lock().len()
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
