// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Tool-approval round-trips originated by the daemon.
//!
//! One pending entry per request id. The oneshot sender is removed from the
//! table before it is fired, so exactly one of {accepted response, timeout}
//! can win; the loser surfaces as an explicit event, never silently.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use vlaude_core::{ClientId, RequestId, SessionId};
use vlaude_wire::DaemonFrame;

/// A mobile client's verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub approved: bool,
    pub reason: Option<String>,
}

/// Terminal outcome of one approval round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Decided(Decision),
    TimedOut,
}

/// Fields describing the prompt sent to the mobile client.
#[derive(Debug, Clone)]
pub struct ApprovalPrompt {
    pub session_id: SessionId,
    pub tool_name: String,
    pub input: Value,
    pub tool_use_id: String,
    pub description: String,
    /// The mobile connection that originated the in-flight request, when
    /// known; the hub falls back to the session's most recent subscriber.
    pub target_client_id: Option<ClientId>,
}

/// Pending approval table with deadline enforcement.
pub struct ApprovalTable {
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Decision>>>,
    deadline: Duration,
}

impl ApprovalTable {
    pub fn new(deadline: Duration) -> Self {
        Self { pending: Mutex::new(HashMap::new()), deadline }
    }

    /// Issue an approval request and await the verdict or the deadline.
    pub async fn request(
        &self,
        uplink: &mpsc::Sender<DaemonFrame>,
        prompt: ApprovalPrompt,
    ) -> ApprovalOutcome {
        let request_id = RequestId::generate();
        let (decision_tx, decision_rx) = oneshot::channel();
        self.pending.lock().insert(request_id.clone(), decision_tx);

        let frame = DaemonFrame::ApprovalRequest {
            request_id: request_id.clone(),
            session_id: prompt.session_id,
            tool_name: prompt.tool_name,
            input: prompt.input,
            tool_use_id: prompt.tool_use_id,
            description: prompt.description,
            target_client_id: prompt.target_client_id,
        };
        if uplink.send(frame).await.is_err() {
            warn!(%request_id, "uplink gone, approval request dropped");
        }

        match tokio::time::timeout(self.deadline, decision_rx).await {
            Ok(Ok(decision)) => {
                info!(%request_id, approved = decision.approved, "approval decided");
                ApprovalOutcome::Decided(decision)
            }
            // Sender dropped without firing — only happens on table teardown.
            Ok(Err(_)) => ApprovalOutcome::TimedOut,
            Err(_) => {
                // Remove the waiter first: a response racing in after this
                // point finds the entry gone and is reported expired.
                self.pending.lock().remove(&request_id);
                let frame = DaemonFrame::ApprovalTimeout {
                    request_id: request_id.clone(),
                    message: "approval request timed out".to_string(),
                };
                let _ = uplink.send(frame).await;
                info!(%request_id, "approval timed out");
                ApprovalOutcome::TimedOut
            }
        }
    }

    /// Deliver a verdict to the pending waiter.
    ///
    /// Returns false for a late or unknown request id; the caller reports
    /// those as `approval-expired`.
    pub fn resolve(&self, request_id: &RequestId, decision: Decision) -> bool {
        let Some(waiter) = self.pending.lock().remove(request_id) else {
            return false;
        };
        waiter.send(decision).is_ok()
    }

    /// Number of in-flight requests.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
