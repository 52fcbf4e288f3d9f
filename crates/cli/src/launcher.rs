// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Spawns the assistant with the UUID side-channel.
//!
//! For a fresh session the assistant's identity is unknown until the
//! launcher leaks the UUIDs it generates. The side-channel is a FIFO this
//! module creates; its path is handed to the launcher via
//! `VLAUDE_UUID_PIPE` and each generated UUID arrives as one JSON line
//! (`{"type":"uuid","value":"…"}`). Several UUIDs may appear before the
//! authoritative one — all are forwarded, the matcher sorts it out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::stat::Mode;
use tokio::io::AsyncBufReadExt;
use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vlaude_core::SessionId;

use crate::env;

/// Assistant launcher configuration.
pub struct Launcher {
    command: Vec<String>,
}

/// A running assistant child.
pub struct RunningAssistant {
    pub child: tokio::process::Child,
    /// UUIDs observed on the side-channel; absent in resume mode.
    pub uuid_rx: Option<mpsc::Receiver<String>>,
    fifo_path: Option<PathBuf>,
    pipe_cancel: CancellationToken,
}

impl Launcher {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Spawn the assistant in `real_path`, resuming `session_id` when given.
    ///
    /// A fresh session gets the FIFO side-channel and a reader task; a
    /// resumed session already has a confirmed identity.
    pub fn spawn(
        &self,
        real_path: &Path,
        session_id: Option<&SessionId>,
    ) -> std::io::Result<RunningAssistant> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(std::io::Error::other("empty assistant command"));
        };
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args).current_dir(real_path);

        let pipe_cancel = CancellationToken::new();
        let mut fifo_path = None;
        let mut uuid_rx = None;
        match session_id {
            Some(session_id) => {
                cmd.args(["--resume", session_id.as_str()]);
            }
            None => {
                let path = create_uuid_fifo()?;
                cmd.env(env::UUID_PIPE_ENV, &path);
                let (tx, rx) = mpsc::channel(16);
                tokio::spawn(pump_uuid_pipe(path.clone(), tx, pipe_cancel.clone()));
                fifo_path = Some(path);
                uuid_rx = Some(rx);
            }
        }

        let child = cmd.spawn()?;
        Ok(RunningAssistant { child, uuid_rx, fifo_path, pipe_cancel })
    }
}

/// Ask a child to wind down with SIGTERM. The caller keeps awaiting the
/// exit; a child that ignores the signal is left to the user's Ctrl-C.
pub fn request_stop(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    let pid = nix::unistd::Pid::from_raw(pid as i32);
    if let Err(e) = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM) {
        debug!(error = %e, "sigterm failed (already gone?)");
    }
}

impl Drop for RunningAssistant {
    fn drop(&mut self) {
        self.pipe_cancel.cancel();
        if let Some(path) = &self.fifo_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Create a uniquely named FIFO in the temp directory.
fn create_uuid_fifo() -> std::io::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("vlaude-uuid-{}.pipe", uuid::Uuid::new_v4()));
    nix::unistd::mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR)
        .map_err(|e| std::io::Error::other(format!("mkfifo: {e}")))?;
    Ok(path)
}

/// Forward UUID lines from the FIFO until cancelled.
///
/// The launcher may open and close the pipe repeatedly (one writer per
/// generated UUID), so EOF re-arms the reader rather than ending it.
async fn pump_uuid_pipe(path: PathBuf, tx: mpsc::Sender<String>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let receiver = match pipe::OpenOptions::new().open_receiver(&path) {
            Ok(receiver) => receiver,
            Err(e) => {
                debug!(error = %e, "uuid pipe open failed");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(200)) => continue,
                    _ = cancel.cancelled() => return,
                }
            }
        };
        let mut lines = tokio::io::BufReader::new(receiver).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if let Some(uuid) = parse_uuid_line(&line) {
                                if tx.send(uuid).await.is_err() {
                                    return;
                                }
                            }
                        }
                        // EOF: the writer closed; wait for the next one.
                        Ok(None) | Err(_) => break,
                    }
                }
                _ = cancel.cancelled() => return,
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Parse one `{"type":"uuid","value":…}` side-channel line.
pub fn parse_uuid_line(line: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
    if json.get("type").and_then(|v| v.as_str()) != Some("uuid") {
        return None;
    }
    json.get("value").and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
