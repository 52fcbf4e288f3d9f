// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! vlaude-daemon: the per-host sidecar.
//!
//! Owns the on-disk session store: maps project paths, watches transcripts,
//! detects new sessions, delivers mobile-originated text to the assistant,
//! and originates tool-approval round-trips. Serves HTTP for the central
//! server and dials out to the hub over one WebSocket uplink for all pushes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod approval;
pub mod assistant;
pub mod env;
pub mod http;
pub mod lifecycle;
pub mod push;
pub mod uplink;

pub use approval::{ApprovalOutcome, ApprovalTable, Decision};
pub use assistant::{AssistantAdapter, DeliveryError, DeliveryRequest, ProcessAssistant};
#[cfg(any(test, feature = "test-support"))]
pub use assistant::FakeAssistant;
pub use http::{router, DaemonCtx};
pub use lifecycle::{Config, LifecycleError};
