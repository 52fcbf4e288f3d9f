// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Frame encoding/decoding for WebSocket text messages.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Maximum frame size (16 MB). A frame carries at most one transcript record.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode a frame to JSON text.
pub fn encode<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    let json = serde_json::to_string(frame)?;
    if json.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: json.len(), max: MAX_FRAME_SIZE });
    }
    Ok(json)
}

/// Decode a frame from JSON text.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: text.len(), max: MAX_FRAME_SIZE });
    }
    Ok(serde_json::from_str(text)?)
}
