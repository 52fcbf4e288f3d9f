// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! WebSocket and REST wire protocol for the vlaude coordinator.
//!
//! WebSocket frames are JSON text messages of the shape
//! `{"event": <name>, "data": <payload>}`. Event names are the external
//! contract and never change casing or spelling.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod daemon;
mod frame;
mod rest;
mod server;

pub use client::ClientFrame;
pub use daemon::{DaemonFrame, SdkErrorInfo};
pub use frame::{decode, encode, ProtocolError, MAX_FRAME_SIZE};
pub use rest::{
    ApiEnvelope, CheckLoadingBody, CreateSessionBody, DetectNewBody, FindNewBody, FoundSession,
    GenerateTokenRequest, LoadingStatus, MessagesQuery, ProjectsQuery, ResumePushBody,
    SendMessageBody, SessionsQuery, TokenResponse, UnwatchBody, WatchBody,
};
pub use server::ServerFrame;
