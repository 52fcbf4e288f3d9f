// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! vlauded — the per-host vlaude sidecar.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vlaude_daemon::{approval, assistant, env, http, lifecycle, push, uplink};

fn main() {
    let config = match lifecycle::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vlauded: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.state_dir) {
        eprintln!("vlauded: cannot create state dir: {e}");
        std::process::exit(1);
    }
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().unwrap_or(&config.state_dir),
        "daemon.log",
    );
    let (writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VLAUDE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "runtime start failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(config)) {
        error!(error = %e, "daemon failed");
        std::process::exit(1);
    }
}

async fn run(config: lifecycle::Config) -> Result<(), Box<dyn std::error::Error>> {
    let started = lifecycle::startup(&config)?;
    let _lock_file = started.lock_file;
    info!(version = env!("CARGO_PKG_VERSION"), addr = %config.http_addr, "vlauded starting");

    let shutdown = CancellationToken::new();
    let (uplink_tx, uplink_rx) = tokio::sync::mpsc::channel(256);
    let approvals = Arc::new(approval::ApprovalTable::new(env::approval_timeout()));

    let ctx = Arc::new(http::DaemonCtx {
        store: started.store.clone(),
        watcher: started.watcher,
        detector: started.detector,
        uplink: uplink_tx.clone(),
        assistant: Arc::new(assistant::ProcessAssistant::new(
            env::assistant_cmd(),
            uplink_tx.clone(),
            Arc::clone(&approvals),
        )),
        shutdown: shutdown.clone(),
    });

    tokio::spawn(push::run_push_bridge(
        started.store,
        started.watch_rx,
        uplink_tx.clone(),
        shutdown.clone(),
    ));
    tokio::spawn(uplink::run_uplink(
        config.hub_url.clone(),
        env::host_name(),
        uplink_rx,
        approvals,
        uplink_tx,
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    let app = http::router(ctx);
    let serve_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = wait_for_sigterm() => {}
            }
            info!("shutdown requested");
            serve_shutdown.cancel();
        })
        .await?;

    info!("vlauded stopped");
    Ok(())
}

async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!(error = %e, "sigterm handler failed");
            std::future::pending::<()>().await;
        }
    }
}
