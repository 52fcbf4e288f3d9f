// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! REST envelope and HTTP bodies.
//!
//! The same envelope shape serves the mobile-facing REST surface and the
//! server→daemon link: `{success, data, message?, total?, hasMore?}`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vlaude_core::{ClientId, SessionId, SortOrder};

/// Uniform response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), message: None, total: None, has_more: None }
    }

    pub fn paged(data: T, total: usize, has_more: bool) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            total: Some(total),
            has_more: Some(has_more),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            total: None,
            has_more: None,
        }
    }
}

/// `POST /sessions/send-message` — mobile text for the daemon to deliver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub session_id: SessionId,
    pub text: String,
    pub real_path: PathBuf,
    /// The mobile connection that sent the text; used to target approvals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
}

/// `POST /sessions/check-loading` — the mode arbiter's graceful-exit probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckLoadingBody {
    pub session_id: SessionId,
    pub real_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LoadingStatus {
    pub loading: bool,
}

/// `POST /sessions/watch` — acquire a transcript watcher reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchBody {
    pub session_id: SessionId,
    pub real_path: PathBuf,
}

/// `POST /sessions/unwatch` — release a watcher reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnwatchBody {
    pub session_id: SessionId,
}

/// `POST /sessions/resume-push` — unpause watcher delivery after a local
/// resume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumePushBody {
    pub session_id: SessionId,
}

/// `POST /sessions/detect-new` — arm the one-shot new-session detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectNewBody {
    pub real_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_client_id: Option<ClientId>,
}

/// `POST /sessions/find-new` — probe for a very recent session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FindNewBody {
    pub real_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoundSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// `POST /sessions` — start a brand-new session from a mobile client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub real_path: PathBuf,
    /// Optional first message to deliver once the session exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
}

/// Query parameters for `GET /projects`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Query parameters for `GET /sessions/by-path`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionsQuery {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Query parameters for `GET /sessions/{sid}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub project_path: PathBuf,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub order: SortOrder,
}

fn default_limit() -> usize {
    50
}

/// `POST /auth/generate-token` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub token: String,
}
