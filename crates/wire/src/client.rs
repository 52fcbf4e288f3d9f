// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vlaude_core::{ClientType, RequestId, SessionId};

/// Frame from a CLI or mobile client to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Register on a session. A mobile joining a CLI-occupied session flips
    /// the session to remote mode; re-joins are allowed and re-emit
    /// `remote-connect`.
    #[serde(rename = "join")]
    Join { session_id: SessionId, client_type: ClientType, real_path: PathBuf },

    /// Release a session registration without disconnecting (used by the CLI
    /// when the assistant internally switches sessions).
    #[serde(rename = "leave")]
    Leave { session_id: SessionId },

    /// Start receiving `message:new` fan-out for a session.
    #[serde(rename = "session:subscribe")]
    Subscribe { session_id: SessionId, real_path: PathBuf },

    #[serde(rename = "session:unsubscribe")]
    Unsubscribe { session_id: SessionId },

    /// Mobile-originated user text, forwarded to the daemon for delivery.
    #[serde(rename = "message:send")]
    SendMessage { session_id: SessionId, text: String },

    /// A UUID observed on the launcher's auxiliary pipe (CLI only). Several
    /// may arrive before the authoritative one.
    #[serde(rename = "cli:reportUUID")]
    ReportUuid { uuid: String, real_path: PathBuf },

    /// CLI asks to take the session back from remote mode.
    #[serde(rename = "cli:requestExitRemote")]
    RequestExitRemote { session_id: SessionId },

    /// CLI has respawned the assistant locally; daemon may resume pushing.
    #[serde(rename = "cli:resumeLocal")]
    ResumeLocal { session_id: SessionId },

    /// Arm the daemon's new-session detector for a project (CLI only).
    #[serde(rename = "watch-new-session")]
    WatchNewSession { real_path: PathBuf },

    /// One-shot probe for a just-created session (CLI only).
    #[serde(rename = "find-new-session")]
    FindNewSession { real_path: PathBuf },

    /// Mobile's verdict on a tool-approval request.
    #[serde(rename = "approval-response")]
    ApprovalResponse {
        request_id: RequestId,
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// First frame on the daemon's uplink connection. Only accepted from
    /// trusted source addresses.
    #[serde(rename = "daemon:hello")]
    DaemonHello { host: String },
}
