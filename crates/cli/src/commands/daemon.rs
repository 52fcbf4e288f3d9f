// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! `vlaude daemon` - sidecar management commands

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};

use crate::env;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Check daemon status
    Status,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show (default: 200)
        #[arg(short = 'n', long, default_value = "200")]
        limit: usize,
        /// Follow log output
        #[arg(long, short)]
        follow: bool,
    },
}

pub async fn daemon(args: DaemonArgs) -> Result<i32> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop(),
        DaemonCommand::Status => status(),
        DaemonCommand::Logs { limit, follow } => logs(limit, follow).await,
    }
}

fn state_dir() -> Result<PathBuf> {
    env::state_dir().ok_or_else(|| anyhow!("no usable state directory (HOME unset)"))
}

fn pid_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("daemon.pid"))
}

fn read_pid() -> Result<Option<i32>> {
    let path = pid_path()?;
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(content.trim().parse().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("reading daemon pid file"),
    }
}

fn is_alive(pid: i32) -> bool {
    // Signal 0: existence probe.
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

/// The daemon binary, preferring a sibling of this executable.
fn daemon_binary() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("vlauded")))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from("vlauded"))
}

async fn start(foreground: bool) -> Result<i32> {
    if let Some(pid) = read_pid()? {
        if is_alive(pid) {
            println!("daemon already running (pid {pid})");
            return Ok(0);
        }
    }

    let binary = daemon_binary();
    if foreground {
        let status = tokio::process::Command::new(&binary)
            .status()
            .await
            .with_context(|| format!("running {}", binary.display()))?;
        return Ok(status.code().unwrap_or(1));
    }

    let child = std::process::Command::new(&binary)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("starting {}", binary.display()))?;
    println!("daemon started (pid {})", child.id());
    Ok(0)
}

fn stop() -> Result<i32> {
    let Some(pid) = read_pid()? else {
        println!("daemon not running");
        return Ok(0);
    };
    if !is_alive(pid) {
        println!("daemon not running (stale pid file)");
        return Ok(0);
    }
    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(pid),
        nix::sys::signal::Signal::SIGTERM,
    )
    .with_context(|| format!("stopping daemon pid {pid}"))?;
    println!("daemon stopping (pid {pid})");
    Ok(0)
}

fn status() -> Result<i32> {
    match read_pid()? {
        Some(pid) if is_alive(pid) => {
            let version = std::fs::read_to_string(state_dir()?.join("daemon.version"))
                .unwrap_or_else(|_| "unknown".to_string());
            println!("daemon running (pid {pid}, version {version})");
            Ok(0)
        }
        _ => {
            println!("daemon not running");
            Ok(1)
        }
    }
}

async fn logs(limit: usize, follow: bool) -> Result<i32> {
    let path = state_dir()?.join("daemon.log");
    if !path.is_file() {
        bail!("no daemon log at {}", path.display());
    }

    let content = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(limit);
    for line in &lines[start..] {
        println!("{line}");
    }

    if !follow {
        return Ok(0);
    }
    let mut offset = content.len() as u64;
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let metadata = std::fs::metadata(&path)?;
        if metadata.len() < offset {
            // Rotated or truncated: start over.
            offset = 0;
        }
        if metadata.len() > offset {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = std::fs::File::open(&path)?;
            file.seek(SeekFrom::Start(offset))?;
            let mut fresh = String::new();
            file.read_to_string(&mut fresh)?;
            offset = metadata.len();
            print!("{fresh}");
        }
    }
}
