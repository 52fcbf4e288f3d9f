// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Session drive mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who is driving a session's assistant.
///
/// `Transitioning` exists only while the graceful-exit probe is in flight;
/// no client-visible event carries it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The CLI wrapper drives the assistant in the terminal.
    #[default]
    Local,
    /// A mobile client drives; the CLI sits in a passive wait loop.
    Remote,
    /// Mid-handover while signals are exchanged.
    Transitioning,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Local => "local",
            Mode::Remote => "remote",
            Mode::Transitioning => "transitioning",
        };
        write!(f, "{s}")
    }
}
