// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vlaude_core::{ClientId, ProjectMeta, RequestId, SessionId, SessionMeta, SessionMetrics};

/// Push from the daemon to the server over the uplink connection.
///
/// The daemon dials out to the hub, so these travel on a WebSocket the
/// daemon initiated; the server answers only with approval-response relays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum DaemonFrame {
    /// A transcript gained a line; `message` is the whole record.
    #[serde(rename = "daemon:newMessage")]
    NewMessage { session_id: SessionId, real_path: PathBuf, message: Value },

    /// Re-derived metrics after a transcript change.
    #[serde(rename = "daemon:metricsUpdate")]
    Metrics { session_id: SessionId, metrics: SessionMetrics },

    /// The new-session detector fired for a project.
    #[serde(rename = "daemon:newSessionCreated")]
    NewSessionCreated {
        session_id: SessionId,
        real_path: PathBuf,
        /// The CLI whose watch request armed the detector, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cli_client_id: Option<ClientId>,
    },

    #[serde(rename = "daemon:sessionUpdated")]
    SessionUpdated { session_id: SessionId, metadata: SessionMeta },

    #[serde(rename = "daemon:projectUpdated")]
    ProjectUpdated { real_path: PathBuf, metadata: ProjectMeta },

    /// A tool call needs a permission decision from a mobile client.
    #[serde(rename = "approval-request")]
    ApprovalRequest {
        request_id: RequestId,
        session_id: SessionId,
        tool_name: String,
        input: Value,
        #[serde(rename = "toolUseID")]
        tool_use_id: String,
        description: String,
        /// Preferred recipient; the hub falls back to the session's most
        /// recent mobile subscriber when absent or gone.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_client_id: Option<ClientId>,
    },

    /// The deadline passed without an accepted response.
    #[serde(rename = "approval-timeout")]
    ApprovalTimeout { request_id: RequestId, message: String },

    /// A response arrived after the deadline and was rejected.
    #[serde(rename = "approval-expired")]
    ApprovalExpired { request_id: RequestId, message: String },

    /// The assistant run failed on the daemon's side.
    #[serde(rename = "sdk-error")]
    SdkError { session_id: SessionId, error: SdkErrorInfo },
}

/// Error detail carried by `sdk-error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SdkErrorInfo {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
