// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Connection registry and session occupancy.
//!
//! One outbox channel per connection; `send` never blocks a handler — a
//! full outbox drops the frame with a warning and the client resynchronizes
//! over REST. Occupancy keeps at most one CLI and any number of mobiles per
//! session; mobiles are kept in join order so "most recent" is the tail.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vlaude_core::{ClientId, ClientType, SessionId};
use vlaude_wire::ServerFrame;

/// One registered connection.
pub struct ClientHandle {
    pub client_type: ClientType,
    pub session_id: Option<SessionId>,
    pub real_path: Option<PathBuf>,
    pub auth_subject: Option<String>,
    /// CIDR-exempt internal connection (may become the daemon uplink).
    pub trusted: bool,
    outbox: mpsc::Sender<ServerFrame>,
}

#[derive(Default)]
struct Occupancy {
    cli: Option<ClientId>,
    /// Join order; the most recently joined mobile is last.
    mobiles: Vec<ClientId>,
}

/// What a join changed, for the caller to act on.
#[derive(Debug, PartialEq)]
pub enum JoinOutcome {
    /// A mobile joined; the session's CLI (if any) was told `remote-connect`.
    MobileJoined { cli_notified: Option<ClientId> },
    /// A CLI joined; told `remote-connect` when mobiles were already there.
    CliJoined { mobiles_present: bool, replaced: Option<ClientId> },
    /// The daemon uplink never joins sessions.
    Ignored,
}

/// What a leave/disconnect changed.
#[derive(Debug, Default, PartialEq)]
pub struct LeaveOutcome {
    pub session_id: Option<SessionId>,
    /// The departing client was the last mobile while a CLI was present;
    /// that CLI was told `remote-disconnect`.
    pub cli_released: Option<ClientId>,
    pub was_daemon: bool,
}

/// Connection and occupancy registry.
#[derive(Default)]
pub struct Hub {
    clients: Mutex<HashMap<ClientId, ClientHandle>>,
    occupancy: Mutex<HashMap<SessionId, Occupancy>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection.
    pub fn register(
        &self,
        client_id: ClientId,
        auth_subject: Option<String>,
        trusted: bool,
        outbox: mpsc::Sender<ServerFrame>,
    ) {
        let handle = ClientHandle {
            client_type: ClientType::Mobile,
            session_id: None,
            real_path: None,
            auth_subject,
            trusted,
            outbox,
        };
        self.clients.lock().insert(client_id, handle);
    }

    pub fn is_trusted(&self, client_id: &ClientId) -> bool {
        self.clients.lock().get(client_id).is_some_and(|c| c.trusted)
    }

    /// Mark a connection as the daemon uplink after its hello.
    pub fn promote_to_daemon(&self, client_id: &ClientId) {
        if let Some(client) = self.clients.lock().get_mut(client_id) {
            client.client_type = ClientType::Daemon;
        }
    }

    pub fn client_type(&self, client_id: &ClientId) -> Option<ClientType> {
        self.clients.lock().get(client_id).map(|c| c.client_type)
    }

    pub fn session_of(&self, client_id: &ClientId) -> Option<SessionId> {
        self.clients.lock().get(client_id).and_then(|c| c.session_id.clone())
    }

    pub fn real_path_of_client(&self, client_id: &ClientId) -> Option<PathBuf> {
        self.clients.lock().get(client_id).and_then(|c| c.real_path.clone())
    }

    pub fn is_connected(&self, client_id: &ClientId) -> bool {
        self.clients.lock().contains_key(client_id)
    }

    /// Queue a frame on a client's outbox. Non-blocking; a slow client's
    /// overflow is dropped (it resynchronizes over REST).
    pub fn send(&self, client_id: &ClientId, frame: ServerFrame) -> bool {
        let outbox = match self.clients.lock().get(client_id) {
            Some(client) => client.outbox.clone(),
            None => return false,
        };
        match outbox.try_send(frame) {
            Ok(()) => true,
            Err(e) => {
                warn!(%client_id, error = %e, "outbox full or closed, frame dropped");
                false
            }
        }
    }

    /// Queue a frame to every connected client.
    pub fn broadcast(&self, frame: &ServerFrame) {
        let outboxes: Vec<(ClientId, mpsc::Sender<ServerFrame>)> = {
            let clients = self.clients.lock();
            clients.iter().map(|(id, c)| (id.clone(), c.outbox.clone())).collect()
        };
        for (client_id, outbox) in outboxes {
            if let Err(e) = outbox.try_send(frame.clone()) {
                debug!(%client_id, error = %e, "broadcast frame dropped");
            }
        }
    }

    /// Record a join and notify the affected CLI synchronously.
    ///
    /// A second CLI on an occupied session replaces the first with a
    /// warning. Mobile re-joins re-emit `remote-connect` so a CLI that
    /// slipped back to local during a brief outage is nudged.
    pub fn join(
        &self,
        client_id: &ClientId,
        session_id: &SessionId,
        client_type: ClientType,
        real_path: &PathBuf,
    ) -> JoinOutcome {
        {
            let mut clients = self.clients.lock();
            if let Some(client) = clients.get_mut(client_id) {
                client.client_type = client_type;
                client.session_id = Some(session_id.clone());
                client.real_path = Some(real_path.clone());
            }
        }

        let (outcome, notify) = {
            let mut occupancy = self.occupancy.lock();
            let entry = occupancy.entry(session_id.clone()).or_default();
            match client_type {
                ClientType::Mobile => {
                    if !entry.mobiles.contains(client_id) {
                        entry.mobiles.push(client_id.clone());
                    } else {
                        // Re-join: refresh recency.
                        entry.mobiles.retain(|id| id != client_id);
                        entry.mobiles.push(client_id.clone());
                    }
                    let cli = entry.cli.clone();
                    (JoinOutcome::MobileJoined { cli_notified: cli.clone() }, cli)
                }
                ClientType::Cli => {
                    let replaced = entry.cli.replace(client_id.clone()).filter(|previous| {
                        previous != client_id
                    });
                    if let Some(previous) = &replaced {
                        warn!(%session_id, %previous, %client_id, "second CLI replaced the first");
                    }
                    let mobiles_present = !entry.mobiles.is_empty();
                    (
                        JoinOutcome::CliJoined { mobiles_present, replaced },
                        mobiles_present.then(|| client_id.clone()),
                    )
                }
                ClientType::Daemon => (JoinOutcome::Ignored, None),
            }
        };

        if let Some(cli) = notify {
            self.send(&cli, ServerFrame::RemoteConnect { session_id: session_id.clone() });
        }
        outcome
    }

    /// Record a leave; tells the CLI `remote-disconnect` when the last
    /// mobile departs.
    pub fn leave(&self, client_id: &ClientId, session_id: &SessionId) -> LeaveOutcome {
        let released = {
            let mut occupancy = self.occupancy.lock();
            let Some(entry) = occupancy.get_mut(session_id) else {
                return LeaveOutcome::default();
            };
            let was_mobile = entry.mobiles.iter().any(|id| id == client_id);
            entry.mobiles.retain(|id| id != client_id);
            if entry.cli.as_ref() == Some(client_id) {
                entry.cli = None;
            }
            let released = (was_mobile && entry.mobiles.is_empty())
                .then(|| entry.cli.clone())
                .flatten();
            if entry.cli.is_none() && entry.mobiles.is_empty() {
                occupancy.remove(session_id);
            }
            released
        };

        if let Some(cli) = &released {
            self.send(cli, ServerFrame::RemoteDisconnect);
        }
        {
            let mut clients = self.clients.lock();
            if let Some(client) = clients.get_mut(client_id) {
                if client.session_id.as_ref() == Some(session_id) {
                    client.session_id = None;
                }
            }
        }
        LeaveOutcome {
            session_id: Some(session_id.clone()),
            cli_released: released,
            was_daemon: false,
        }
    }

    /// Remove a connection entirely.
    pub fn disconnect(&self, client_id: &ClientId) -> LeaveOutcome {
        let removed = self.clients.lock().remove(client_id);
        let Some(removed) = removed else { return LeaveOutcome::default() };
        let was_daemon = removed.client_type == ClientType::Daemon;
        let mut outcome = match removed.session_id {
            Some(session_id) => self.leave(client_id, &session_id),
            None => LeaveOutcome::default(),
        };
        outcome.was_daemon = was_daemon;
        outcome
    }

    pub fn cli_of(&self, session_id: &SessionId) -> Option<ClientId> {
        self.occupancy.lock().get(session_id).and_then(|o| o.cli.clone())
    }

    pub fn mobiles_of(&self, session_id: &SessionId) -> Vec<ClientId> {
        self.occupancy.lock().get(session_id).map(|o| o.mobiles.clone()).unwrap_or_default()
    }

    /// The most recently joined mobile of a session.
    pub fn last_mobile_of(&self, session_id: &SessionId) -> Option<ClientId> {
        self.occupancy.lock().get(session_id).and_then(|o| o.mobiles.last().cloned())
    }

    pub fn has_occupancy(&self, session_id: &SessionId) -> bool {
        self.occupancy.lock().contains_key(session_id)
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
