// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! vlaude-server — the central hub.

use std::net::SocketAddr;
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vlaude_core::SystemClock;

use vlaude_server::dispatch::ServerCtx;
use vlaude_server::{
    env, rest, ApprovalRouter, Auth, DaemonApi, DaemonLink, Hub, ModeArbiter, SubscriptionRouter,
    UuidMatcher,
};

fn main() {
    let Some(state_dir) = env::state_dir() else {
        eprintln!("vlaude-server: no usable state directory (HOME unset)");
        std::process::exit(1);
    };
    if let Err(e) = std::fs::create_dir_all(&state_dir) {
        eprintln!("vlaude-server: cannot create state dir: {e}");
        std::process::exit(1);
    }

    let file_appender = tracing_appender::rolling::never(&state_dir, "server.log");
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
    if let Err(e) = runtime.block_on(run(state_dir)) {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run(state_dir: std::path::PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    // Single instance per state dir.
    let lock_path = state_dir.join("server.pid");
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    lock_file.try_lock_exclusive()?;
    {
        use std::io::Write;
        let mut lock_file = &lock_file;
        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
    }

    let public_pem = match env::jwt_public_key_path() {
        Some(path) => Some(std::fs::read(path)?),
        None => None,
    };
    let private_pem = match env::jwt_private_key_path() {
        Some(path) => Some(std::fs::read(path)?),
        None => None,
    };
    let auth = Auth::new(public_pem.as_deref(), private_pem.as_deref(), &env::trusted_cidrs())?;

    let ctx = Arc::new(ServerCtx {
        hub: Hub::new(),
        router: SubscriptionRouter::new(),
        matcher: UuidMatcher::new(),
        arbiter: ModeArbiter::new(),
        approvals: ApprovalRouter::new(),
        link: Arc::new(DaemonLink::new(env::daemon_base())) as Arc<dyn DaemonApi>,
        auth,
        daemon_client: Mutex::new(None),
        clock: SystemClock,
    });

    let addr = env::bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(version = env!("CARGO_PKG_VERSION"), %addr, "vlaude-server listening");

    let app = rest::router(ctx);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    info!("vlaude-server stopped");
    Ok(())
}
