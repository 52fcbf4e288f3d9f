// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vlaude_core::{ClientId, Mode, ProjectMeta, RequestId, SessionId, SessionMeta};

use crate::daemon::SdkErrorInfo;

/// Frame from the server to a connected client (or, for the approval-response
/// relay, to the daemon's uplink).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// A new transcript record for a subscribed session.
    #[serde(rename = "message:new")]
    NewMessage { session_id: SessionId, message: Value },

    #[serde(rename = "project:updated")]
    ProjectUpdated { real_path: PathBuf, metadata: ProjectMeta },

    #[serde(rename = "session:updated")]
    SessionUpdated { session_id: SessionId, metadata: SessionMeta },

    /// Metrics push for the out-of-process status line.
    #[serde(rename = "statusline:metricsUpdate")]
    MetricsUpdate {
        session_id: SessionId,
        connected: bool,
        mode: Mode,
        context_length: u64,
        context_percentage: f64,
        input_tokens: u64,
        output_tokens: u64,
        /// Epoch milliseconds at emission.
        timestamp: u64,
    },

    /// A mobile client now drives this session; the CLI must stop its child.
    #[serde(rename = "remote-connect")]
    RemoteConnect { session_id: SessionId },

    /// The last mobile left; the CLI may take the session back.
    #[serde(rename = "remote-disconnect")]
    RemoteDisconnect,

    /// The UUID matcher confirmed this CLI's session identity.
    #[serde(rename = "server:sessionConfirmed")]
    SessionConfirmed { session_id: SessionId },

    #[serde(rename = "server:exitRemoteAllowed")]
    ExitRemoteAllowed { session_id: SessionId },

    /// Exit was refused, e.g. because the assistant is mid-generation.
    #[serde(rename = "server:exitRemoteDenied")]
    ExitRemoteDenied { session_id: SessionId, reason: String },

    #[serde(rename = "new-session-created")]
    NewSessionCreated { session_id: SessionId, real_path: PathBuf },

    #[serde(rename = "new-session-found")]
    NewSessionFound { session_id: SessionId, real_path: PathBuf },

    #[serde(rename = "new-session-not-found")]
    NewSessionNotFound { real_path: PathBuf },

    #[serde(rename = "watch-started")]
    WatchStarted { real_path: PathBuf },

    /// Tool-approval prompt forwarded to one mobile client.
    #[serde(rename = "approval-request")]
    ApprovalRequest {
        request_id: RequestId,
        session_id: SessionId,
        tool_name: String,
        input: Value,
        #[serde(rename = "toolUseID")]
        tool_use_id: String,
        description: String,
    },

    #[serde(rename = "approval-timeout")]
    ApprovalTimeout { request_id: RequestId, message: String },

    #[serde(rename = "approval-expired")]
    ApprovalExpired { request_id: RequestId, message: String },

    #[serde(rename = "sdk-error")]
    SdkError { session_id: SessionId, error: SdkErrorInfo },

    /// Mobile verdict relayed to the daemon (uplink direction only).
    #[serde(rename = "approval-response")]
    ApprovalResponse {
        request_id: RequestId,
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },

    /// Direct acknowledgement of a client frame, carrying failures such as
    /// protocol violations.
    #[serde(rename = "ack")]
    Ack {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}
