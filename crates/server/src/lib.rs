// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! vlaude-server: the central hub.
//!
//! Owns WebSocket connectivity, authentication, session occupancy, mode
//! arbitration, UUID matching, subscription fan-out, and the approval
//! bridge. Talks to the per-host daemon over HTTP (outbound) and receives
//! its pushes on the daemon's WebSocket uplink (inbound).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod approval;
pub mod auth;
pub mod daemon_link;
pub mod dispatch;
pub mod env;
pub mod hub;
pub mod matcher;
pub mod mode;
pub mod rest;
pub mod router;
pub mod ws;

pub use approval::ApprovalRouter;
pub use auth::{Auth, AuthError, AuthSubject};
pub use daemon_link::{DaemonApi, DaemonLink, LinkError};
pub use dispatch::ServerCtx;
pub use hub::Hub;
pub use matcher::UuidMatcher;
pub use mode::ModeArbiter;
pub use router::SubscriptionRouter;
