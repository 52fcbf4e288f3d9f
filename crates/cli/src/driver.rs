// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! The CLI mode loop.
//!
//! LOCAL: the assistant runs in this terminal; the launcher's UUID pipe
//! feeds the matcher until the server confirms the session identity. A
//! `remote-connect` stops the child gracefully and flips to REMOTE.
//! REMOTE: the terminal sits in a raw-mode wait loop; `q`/ESC asks the
//! server for a graceful exit (denied while the assistant is
//! mid-generation), Ctrl-C force-quits, and `remote-disconnect` hands the
//! session back. Every flip respawns the assistant with the confirmed
//! session id in resume mode.

use std::path::PathBuf;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vlaude_core::{ClientType, Mode, SessionId};
use vlaude_wire::{ClientFrame, ServerFrame};

use crate::control::{ControlEvent, ControlSocket};
use crate::launcher::{request_stop, Launcher};
use crate::statusline::{self, StatusState, StatusWriter, SwitchSignal};
use crate::term::{self, Key};
use crate::{env, statusline::watch_switch_signal};

/// How one LOCAL/REMOTE iteration ended.
#[derive(Debug, PartialEq)]
enum IterationEnd {
    /// Flip to the other mode.
    Switch,
    /// Terminate with this exit code.
    Exit(i32),
}

pub struct Driver {
    real_path: PathBuf,
    session_id: Option<SessionId>,
    control: ControlSocket,
    launcher: Launcher,
    status: StatusWriter,
    state_tx: watch::Sender<StatusState>,
    switch_rx: mpsc::Receiver<SwitchSignal>,
    heartbeat_cancel: Option<CancellationToken>,
    cancel: CancellationToken,
}

impl Driver {
    /// Wire up the control socket and side-channel watchers. Must be called
    /// within a tokio runtime.
    pub fn new(real_path: PathBuf, session_id: Option<SessionId>) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();
        let control = ControlSocket::connect(env::hub_url(), cancel.clone());
        let (switch_tx, switch_rx) = mpsc::channel(8);
        watch_switch_signal(&real_path, switch_tx, cancel.clone())
            .context("session-switch watcher")?;
        let (state_tx, _) = watch::channel(StatusState { connected: false, mode: Mode::Local });
        Ok(Self {
            status: StatusWriter::new(&real_path),
            launcher: Launcher::new(env::assistant_cmd()),
            real_path,
            session_id,
            control,
            state_tx,
            switch_rx,
            heartbeat_cancel: None,
            cancel,
        })
    }

    pub async fn run(mut self) -> anyhow::Result<i32> {
        match &self.session_id {
            Some(session_id) => {
                let session_id = session_id.clone();
                self.join_session(&session_id).await;
                self.start_heartbeat(session_id);
            }
            None => {
                // Ask the daemon to watch for the transcript this launch is
                // about to create.
                self.control
                    .send(ClientFrame::WatchNewSession { real_path: self.real_path.clone() })
                    .await;
            }
        }

        let mut mode = Mode::Local;
        let mut returning_from_remote = false;
        let code = loop {
            let end = match mode {
                Mode::Remote => self.remote_iteration().await?,
                _ => self.local_iteration(returning_from_remote).await?,
            };
            match end {
                IterationEnd::Switch => {
                    returning_from_remote = mode == Mode::Remote;
                    mode = if mode == Mode::Remote { Mode::Local } else { Mode::Remote };
                }
                IterationEnd::Exit(code) => break code,
            }
        };

        if let Some(heartbeat) = self.heartbeat_cancel.take() {
            heartbeat.cancel();
        }
        if let Some(session_id) = &self.session_id {
            self.status.remove(session_id);
        }
        self.cancel.cancel();
        Ok(code)
    }

    /// One LOCAL iteration: run the assistant until it exits or a remote
    /// client takes over.
    async fn local_iteration(&mut self, returning_from_remote: bool) -> anyhow::Result<IterationEnd> {
        self.set_mode(Mode::Local);
        if returning_from_remote {
            if let Some(session_id) = &self.session_id {
                // Watcher pushes may resume now that this terminal drives.
                self.control
                    .send(ClientFrame::ResumeLocal { session_id: session_id.clone() })
                    .await;
            }
        }

        let mut running = self
            .launcher
            .spawn(&self.real_path, self.session_id.as_ref())
            .context("spawning assistant")?;
        let child_pid = running.child.id();
        let mut uuid_rx = running.uuid_rx.take();
        info!(session_id = ?self.session_id, pid = ?child_pid, "assistant started");

        let mut switching = false;
        loop {
            tokio::select! {
                status = running.child.wait() => {
                    let status = status.context("waiting for assistant")?;
                    if switching {
                        return Ok(IterationEnd::Switch);
                    }
                    let code = status.code().unwrap_or(1);
                    if code != 0 {
                        warn!(code, "assistant exited abnormally");
                    }
                    return Ok(IterationEnd::Exit(code));
                }

                uuid = recv_or_pending(&mut uuid_rx) => {
                    match uuid {
                        Some(uuid) => {
                            self.control
                                .send(ClientFrame::ReportUuid {
                                    uuid,
                                    real_path: self.real_path.clone(),
                                })
                                .await;
                        }
                        // Pipe reader ended; stop polling it.
                        None => uuid_rx = None,
                    }
                }

                event = self.control.events.recv() => {
                    let Some(event) = event else {
                        anyhow::bail!("control socket task ended");
                    };
                    if let Some(end) = self.handle_local_event(event, &mut switching, child_pid) {
                        return Ok(end);
                    }
                }

                signal = self.switch_rx.recv() => {
                    match signal {
                        Some(signal) => self.handle_session_switch(signal).await,
                        // Watcher task gone; throttle instead of spinning.
                        None => tokio::time::sleep(std::time::Duration::from_secs(1)).await,
                    }
                }
            }
        }
    }

    /// Returns an iteration end when the event terminates the loop.
    fn handle_local_event(
        &mut self,
        event: ControlEvent,
        switching: &mut bool,
        child_pid: Option<u32>,
    ) -> Option<IterationEnd> {
        match event {
            ControlEvent::Connected => {
                self.set_connected(true);
                if let Some(session_id) = self.session_id.clone() {
                    // Re-assert occupancy after an outage.
                    let control_frame = ClientFrame::Join {
                        session_id,
                        client_type: ClientType::Cli,
                        real_path: self.real_path.clone(),
                    };
                    let control = self.control_sender();
                    tokio::spawn(async move {
                        let _ = control.send(control_frame).await;
                    });
                }
                None
            }
            ControlEvent::Disconnected => {
                self.set_connected(false);
                None
            }
            ControlEvent::Frame(ServerFrame::SessionConfirmed { session_id }) => {
                info!(%session_id, "session confirmed");
                self.session_id = Some(session_id.clone());
                self.start_heartbeat(session_id.clone());
                let join = ClientFrame::Join {
                    session_id,
                    client_type: ClientType::Cli,
                    real_path: self.real_path.clone(),
                };
                let control = self.control_sender();
                tokio::spawn(async move {
                    let _ = control.send(join).await;
                });
                None
            }
            ControlEvent::Frame(ServerFrame::RemoteConnect { session_id }) => {
                info!(%session_id, "remote client took over");
                notify_desktop("Remote client connected — handing the session over");
                *switching = true;
                request_stop(child_pid);
                None
            }
            ControlEvent::Frame(frame) => {
                debug!(?frame, "frame ignored in local mode");
                None
            }
        }
    }

    /// One REMOTE iteration: passive wait loop while a mobile drives.
    async fn remote_iteration(&mut self) -> anyhow::Result<IterationEnd> {
        let Some(session_id) = self.session_id.clone() else {
            // Cannot be remote-driven without a confirmed identity.
            return Ok(IterationEnd::Switch);
        };
        self.set_mode(Mode::Remote);
        term::clear_screen();
        println!("Session {session_id} is remote-controlled.");
        println!("Press q or ESC to take it back. Ctrl-C quits.");

        let raw_guard = match term::RawModeGuard::enter() {
            Ok(guard) => Some(guard),
            Err(e) => {
                debug!(error = %e, "raw mode unavailable");
                None
            }
        };

        let key_cancel = CancellationToken::new();
        let (key_tx, mut key_rx) = mpsc::channel(8);
        tokio::spawn(read_keys(key_tx, key_cancel.clone()));

        let end = loop {
            tokio::select! {
                key = key_rx.recv() => {
                    match key {
                        Some(Key::ExitRequest) => {
                            self.control
                                .send(ClientFrame::RequestExitRemote {
                                    session_id: session_id.clone(),
                                })
                                .await;
                        }
                        Some(Key::ForceQuit) => break IterationEnd::Exit(130),
                        Some(Key::Other) => {}
                        // Stdin gone (not a tty); wait on control events only.
                        None => tokio::time::sleep(std::time::Duration::from_secs(1)).await,
                    }
                }

                event = self.control.events.recv() => {
                    let Some(event) = event else {
                        anyhow::bail!("control socket task ended");
                    };
                    match event {
                        ControlEvent::Connected => {
                            self.set_connected(true);
                            self.join_session(&session_id).await;
                        }
                        ControlEvent::Disconnected => self.set_connected(false),
                        ControlEvent::Frame(ServerFrame::ExitRemoteAllowed { .. })
                        | ControlEvent::Frame(ServerFrame::RemoteDisconnect) => {
                            info!(%session_id, "taking the session back");
                            notify_desktop("Session returned to this terminal");
                            break IterationEnd::Switch;
                        }
                        ControlEvent::Frame(ServerFrame::ExitRemoteDenied { reason, .. }) => {
                            println!("Cannot take over yet: {reason}");
                        }
                        ControlEvent::Frame(frame) => {
                            debug!(?frame, "frame ignored in remote mode");
                        }
                    }
                }

                signal = self.switch_rx.recv() => {
                    match signal {
                        Some(signal) => self.handle_session_switch(signal).await,
                        None => tokio::time::sleep(std::time::Duration::from_secs(1)).await,
                    }
                }
            }
        };

        key_cancel.cancel();
        drop(raw_guard);
        Ok(end)
    }

    /// The assistant switched sessions internally (in-program resume):
    /// re-home occupancy onto the new id.
    async fn handle_session_switch(&mut self, signal: SwitchSignal) {
        info!(
            previous = %signal.previous_session_id,
            current = %signal.current_session_id,
            "internal session switch"
        );
        if self.session_id.as_ref() == Some(&signal.previous_session_id) {
            self.control
                .send(ClientFrame::Leave { session_id: signal.previous_session_id.clone() })
                .await;
            self.status.remove(&signal.previous_session_id);
        }
        self.session_id = Some(signal.current_session_id.clone());
        self.join_session(&signal.current_session_id).await;
        self.start_heartbeat(signal.current_session_id);
    }

    async fn join_session(&self, session_id: &SessionId) {
        self.control
            .send(ClientFrame::Join {
                session_id: session_id.clone(),
                client_type: ClientType::Cli,
                real_path: self.real_path.clone(),
            })
            .await;
    }

    fn start_heartbeat(&mut self, session_id: SessionId) {
        if let Some(previous) = self.heartbeat_cancel.take() {
            previous.cancel();
        }
        let heartbeat_cancel = self.cancel.child_token();
        tokio::spawn(statusline::run_heartbeat(
            self.status.clone(),
            session_id,
            self.state_tx.subscribe(),
            heartbeat_cancel.clone(),
        ));
        self.heartbeat_cancel = Some(heartbeat_cancel);
    }

    fn set_mode(&self, mode: Mode) {
        let connected = self.control.is_connected();
        let _ = self.state_tx.send(StatusState { connected, mode });
    }

    fn set_connected(&self, connected: bool) {
        self.state_tx.send_modify(|state| state.connected = connected);
    }

    fn control_sender(&self) -> ControlSender {
        ControlSender { outgoing: self.control.sender() }
    }
}

/// Cheap clone of the control outbox for use inside spawned tasks.
pub struct ControlSender {
    outgoing: mpsc::Sender<ClientFrame>,
}

impl ControlSender {
    pub async fn send(&self, frame: ClientFrame) -> bool {
        self.outgoing.send(frame).await.is_ok()
    }
}

/// `recv` on an optional channel that never resolves when absent.
async fn recv_or_pending(rx: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Forward raw-mode key presses until cancelled.
async fn read_keys(tx: mpsc::Sender<Key>, cancel: CancellationToken) {
    use tokio::io::AsyncReadExt;
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 1];
    loop {
        tokio::select! {
            read = stdin.read(&mut buf) => {
                match read {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {
                        if tx.send(term::decode_key(buf[0])).await.is_err() {
                            return;
                        }
                    }
                }
            }
            _ = cancel.cancelled() => return,
        }
    }
}

fn notify_desktop(body: &str) {
    if let Err(e) = notify_rust::Notification::new().summary("vlaude").body(body).show() {
        debug!(error = %e, "desktop notification failed");
    }
}
