// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Remote-mode delivery: running the assistant on behalf of a mobile client.
//!
//! The daemon owns the assistant process while a session is remote-driven.
//! Each delivery spawns the assistant in print mode (resuming the session
//! when one exists) inside the project directory; the reply reaches clients
//! through the transcript watcher, never through this process's stdout.
//!
//! Stdio contract with the assistant binary: stdout is a JSONL stream.
//! `{"type":"permission_request", "toolName", "input", "toolUseID",
//! "description"}` lines ask for a tool decision and are answered on stdin
//! with `{"type":"permission_response", "toolUseID", "approved", "reason"}`.
//! `{"type":"error", "errorType", "message"}` lines and non-zero exits are
//! surfaced to the owning mobile client as `sdk-error`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vlaude_core::{ClientId, SessionId};
use vlaude_wire::{DaemonFrame, SdkErrorInfo};

use crate::approval::{ApprovalOutcome, ApprovalPrompt, ApprovalTable, Decision};

/// One mobile-originated delivery.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    /// Absent for a brand-new session: the assistant picks its own UUID and
    /// the transcript appears through the new-session detector.
    pub session_id: Option<SessionId>,
    pub real_path: PathBuf,
    pub text: String,
    pub client_id: Option<ClientId>,
}

/// Errors from a delivery run.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to spawn assistant: {0}")]
    Spawn(std::io::Error),

    #[error("assistant exited with {code:?}: {detail}")]
    Failed { code: Option<i32>, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeliveryError {
    /// Map to the wire error info carried by `sdk-error`.
    pub fn to_sdk_error(&self) -> SdkErrorInfo {
        let error_type = match self {
            DeliveryError::Spawn(_) => "spawn_failed",
            DeliveryError::Failed { .. } => "assistant_failed",
            DeliveryError::Io(_) => "io",
        };
        SdkErrorInfo { error_type: error_type.to_string(), message: self.to_string() }
    }
}

/// Something that can run the assistant for one delivery.
#[async_trait]
pub trait AssistantAdapter: Send + Sync {
    async fn deliver(&self, request: DeliveryRequest) -> Result<(), DeliveryError>;
}

/// Real adapter: spawns the configured assistant binary per delivery.
pub struct ProcessAssistant {
    command: Vec<String>,
    uplink: mpsc::Sender<DaemonFrame>,
    approvals: Arc<ApprovalTable>,
}

impl ProcessAssistant {
    pub fn new(
        command: Vec<String>,
        uplink: mpsc::Sender<DaemonFrame>,
        approvals: Arc<ApprovalTable>,
    ) -> Self {
        Self { command, uplink, approvals }
    }
}

#[async_trait]
impl AssistantAdapter for ProcessAssistant {
    async fn deliver(&self, request: DeliveryRequest) -> Result<(), DeliveryError> {
        let Some((program, base_args)) = self.command.split_first() else {
            return Err(DeliveryError::Failed {
                code: None,
                detail: "empty assistant command".to_string(),
            });
        };

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(base_args)
            .arg("-p")
            .args(["--output-format", "stream-json"])
            .current_dir(&request.real_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(session_id) = &request.session_id {
            cmd.args(["--resume", session_id.as_str()]);
        }
        cmd.arg(&request.text);

        info!(
            session_id = ?request.session_id,
            project = %request.real_path.display(),
            "spawning assistant for delivery"
        );
        let mut child = cmd.spawn().map_err(DeliveryError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DeliveryError::Failed { code: None, detail: "assistant stdout unavailable".into() }
        })?;
        let mut stdin = child.stdin.take();

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            let Ok(record) = serde_json::from_str::<serde_json::Value>(&line) else {
                debug!("unparseable assistant output line dropped");
                continue;
            };
            match record.get("type").and_then(|v| v.as_str()) {
                Some("permission_request") => {
                    let decision = self.handle_permission(&request, &record).await;
                    if let Some(stdin) = stdin.as_mut() {
                        let response = serde_json::json!({
                            "type": "permission_response",
                            "toolUseID": record.get("toolUseID").cloned().unwrap_or_default(),
                            "approved": decision.approved,
                            "reason": decision.reason,
                        });
                        let mut bytes = response.to_string().into_bytes();
                        bytes.push(b'\n');
                        if stdin.write_all(&bytes).await.is_err() {
                            warn!("assistant stdin closed mid-approval");
                        }
                    }
                }
                Some("error") => {
                    let error = SdkErrorInfo {
                        error_type: record
                            .get("errorType")
                            .and_then(|v| v.as_str())
                            .unwrap_or("unknown")
                            .to_string(),
                        message: record
                            .get("message")
                            .and_then(|v| v.as_str())
                            .unwrap_or("unknown error")
                            .to_string(),
                    };
                    self.push_sdk_error(&request, error).await;
                }
                _ => {}
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DeliveryError::Failed { code: output.status.code(), detail });
        }
        Ok(())
    }
}

impl ProcessAssistant {
    async fn handle_permission(
        &self,
        request: &DeliveryRequest,
        record: &serde_json::Value,
    ) -> Decision {
        let field = |name: &str| {
            record.get(name).and_then(|v| v.as_str()).unwrap_or_default().to_string()
        };
        // New-session deliveries have no confirmed id yet; a permission
        // prompt before confirmation cannot be routed and is denied.
        let Some(session_id) = request.session_id.clone() else {
            return Decision { approved: false, reason: Some("session not confirmed".into()) };
        };
        let prompt = ApprovalPrompt {
            session_id,
            tool_name: field("toolName"),
            input: record.get("input").cloned().unwrap_or(serde_json::Value::Null),
            tool_use_id: field("toolUseID"),
            description: field("description"),
            target_client_id: request.client_id.clone(),
        };
        match self.approvals.request(&self.uplink, prompt).await {
            ApprovalOutcome::Decided(decision) => decision,
            ApprovalOutcome::TimedOut => {
                Decision { approved: false, reason: Some("approval timed out".into()) }
            }
        }
    }

    async fn push_sdk_error(&self, request: &DeliveryRequest, error: SdkErrorInfo) {
        let Some(session_id) = request.session_id.clone() else { return };
        let _ = self.uplink.send(DaemonFrame::SdkError { session_id, error }).await;
    }
}

/// Recording fake for tests: captures requests, optionally failing.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeAssistant {
    pub deliveries: parking_lot::Mutex<Vec<DeliveryRequest>>,
    pub fail_with: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeAssistant {
    pub fn new() -> Self {
        Self { deliveries: parking_lot::Mutex::new(Vec::new()), fail_with: None }
    }

    pub fn failing(detail: impl Into<String>) -> Self {
        Self { deliveries: parking_lot::Mutex::new(Vec::new()), fail_with: Some(detail.into()) }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl AssistantAdapter for FakeAssistant {
    async fn deliver(&self, request: DeliveryRequest) -> Result<(), DeliveryError> {
        self.deliveries.lock().push(request);
        match &self.fail_with {
            Some(detail) => {
                Err(DeliveryError::Failed { code: Some(1), detail: detail.clone() })
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "assistant_tests.rs"]
mod tests;
