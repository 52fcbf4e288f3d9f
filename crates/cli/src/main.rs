// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! vlaude — wraps the local coding assistant so a mobile client can watch,
//! take over, and hand back the session.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod control;
mod driver;
mod env;
mod launcher;
mod statusline;
mod term;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vlaude", version, about = "Remote bridge for a local coding assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Launch the assistant in the current project (default)
    Run {
        /// Resume an existing session instead of starting fresh
        #[arg(long)]
        session: Option<String>,
    },
    /// Resume an existing session by id
    Resume { session_id: String },
    /// Manage the local sidecar daemon
    Daemon(commands::daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VLAUDE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        None => commands::run::run(None).await,
        Some(Command::Run { session }) => commands::run::run(session).await,
        Some(Command::Resume { session_id }) => commands::run::run(Some(session_id)).await,
        Some(Command::Daemon(args)) => commands::daemon::daemon(args).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("vlaude: {e:#}");
            std::process::exit(1);
        }
    }
}
