// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Approval routing at the hub.
//!
//! The daemon owns deadlines and at-most-once resolution; the hub only
//! remembers which mobile client each request was addressed to, so verdicts
//! and timeouts can be routed. Late responses are broadcast as expired
//! because the hub does not track which client sent them.

use std::collections::HashMap;

use parking_lot::Mutex;
use vlaude_core::{ClientId, RequestId, SessionId};

/// Where an in-flight approval request was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRoute {
    pub session_id: SessionId,
    pub target: ClientId,
}

/// Request-id → target registry.
#[derive(Default)]
pub struct ApprovalRouter {
    routes: Mutex<HashMap<RequestId, ApprovalRoute>>,
}

impl ApprovalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, request_id: RequestId, session_id: SessionId, target: ClientId) {
        self.routes.lock().insert(request_id, ApprovalRoute { session_id, target });
    }

    pub fn route(&self, request_id: &RequestId) -> Option<ApprovalRoute> {
        self.routes.lock().get(request_id).cloned()
    }

    /// Remove a route once a verdict or timeout settled it.
    pub fn remove(&self, request_id: &RequestId) -> Option<ApprovalRoute> {
        self.routes.lock().remove(request_id)
    }

    pub fn open_routes(&self) -> usize {
        self.routes.lock().len()
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
