// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Frame dispatch: ties the hub, router, matcher, arbiter, approval routes,
//! and daemon link together.
//!
//! Each WebSocket connection runs one read loop calling into here, so frame
//! handling for a given client is sequential: `remote-connect` emitted
//! inside a mobile's `join` is queued before any later `message:send` from
//! that mobile is even read.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use vlaude_core::{ClientId, ClientType, Clock, SystemClock};
use vlaude_wire::{ClientFrame, DaemonFrame, SendMessageBody, ServerFrame};

use crate::approval::ApprovalRouter;
use crate::auth::Auth;
use crate::daemon_link::DaemonApi;
use crate::hub::{Hub, JoinOutcome};
use crate::matcher::UuidMatcher;
use crate::mode::{ExitVerdict, ModeArbiter};
use crate::router::SubscriptionRouter;

/// Protocol-violation reply for `message:send` before `join`.
pub const JOIN_FIRST_MESSAGE: &str = "请先加入会话";

/// Shared server state, one per process, built at startup.
pub struct ServerCtx {
    pub hub: Hub,
    pub router: SubscriptionRouter,
    pub matcher: UuidMatcher,
    pub arbiter: ModeArbiter,
    pub approvals: ApprovalRouter,
    pub link: Arc<dyn DaemonApi>,
    pub auth: Auth,
    /// The current daemon uplink connection, if one is attached.
    pub daemon_client: Mutex<Option<ClientId>>,
    pub clock: SystemClock,
}

impl ServerCtx {
    fn daemon(&self) -> Option<ClientId> {
        self.daemon_client.lock().clone()
    }
}

/// Handle one frame from a CLI or mobile connection.
pub async fn handle_client_frame(ctx: &Arc<ServerCtx>, client_id: &ClientId, frame: ClientFrame) {
    match frame {
        ClientFrame::Join { session_id, client_type, real_path } => {
            let outcome = ctx.hub.join(client_id, &session_id, client_type, &real_path);
            match outcome {
                JoinOutcome::MobileJoined { .. } => {
                    ctx.arbiter.set_remote(&session_id);
                }
                JoinOutcome::CliJoined { mobiles_present, .. } => {
                    if mobiles_present {
                        ctx.arbiter.set_remote(&session_id);
                    }
                }
                JoinOutcome::Ignored => {}
            }
            ctx.hub.send(client_id, ServerFrame::Ack { success: true, message: None });
        }

        ClientFrame::Leave { session_id } => {
            let outcome = ctx.hub.leave(client_id, &session_id);
            if outcome.cli_released.is_some() {
                ctx.arbiter.set_local(&session_id);
            }
            if !ctx.hub.has_occupancy(&session_id) {
                ctx.arbiter.forget(&session_id);
            }
        }

        ClientFrame::Subscribe { session_id, real_path } => {
            let first = ctx.router.subscribe(&session_id, &real_path, client_id);
            if first {
                if let Err(e) = ctx.link.watch(&session_id, &real_path).await {
                    warn!(%session_id, error = %e, "watch acquire failed");
                }
            }
            ctx.hub.send(client_id, ServerFrame::Ack { success: true, message: None });
        }

        ClientFrame::Unsubscribe { session_id } => {
            let last = ctx.router.unsubscribe(&session_id, client_id);
            if last {
                if let Err(e) = ctx.link.unwatch(&session_id).await {
                    warn!(%session_id, error = %e, "watch release failed");
                }
            }
        }

        ClientFrame::SendMessage { session_id, text } => {
            if ctx.hub.session_of(client_id).as_ref() != Some(&session_id) {
                ctx.hub.send(
                    client_id,
                    ServerFrame::Ack {
                        success: false,
                        message: Some(JOIN_FIRST_MESSAGE.to_string()),
                    },
                );
                return;
            }
            let Some(real_path) = ctx
                .hub
                .real_path_of_client(client_id)
                .or_else(|| ctx.router.real_path_of(&session_id))
            else {
                ctx.hub.send(
                    client_id,
                    ServerFrame::Ack { success: false, message: Some("unknown project".into()) },
                );
                return;
            };
            let body = SendMessageBody {
                session_id: session_id.clone(),
                text,
                real_path,
                client_id: Some(client_id.clone()),
            };
            if let Err(e) = ctx.link.send_message(body).await {
                warn!(%session_id, error = %e, "send-message delivery failed");
                ctx.hub.send(
                    client_id,
                    ServerFrame::Ack { success: false, message: Some(e.to_string()) },
                );
            }
        }

        ClientFrame::ReportUuid { uuid, real_path } => {
            if let Some(confirmation) = ctx.matcher.report_cli_uuid(&real_path, &uuid, client_id)
            {
                notify_confirmed(ctx, confirmation);
            }
        }

        ClientFrame::RequestExitRemote { session_id } => {
            let real_path = ctx
                .hub
                .real_path_of_client(client_id)
                .or_else(|| ctx.router.real_path_of(&session_id));
            ctx.arbiter.begin_transition(&session_id);
            let loading = match real_path {
                Some(real_path) => {
                    match ctx.link.check_loading(&session_id, &real_path).await {
                        Ok(loading) => loading,
                        Err(e) => {
                            // Advisory probe: an unreachable daemon cannot
                            // hold the CLI hostage.
                            warn!(%session_id, error = %e, "loading probe failed");
                            false
                        }
                    }
                }
                None => false,
            };
            let frame = match ctx.arbiter.settle_exit(&session_id, loading) {
                ExitVerdict::Allowed => {
                    info!(%session_id, "exit remote allowed");
                    ServerFrame::ExitRemoteAllowed { session_id: session_id.clone() }
                }
                ExitVerdict::Denied { reason } => {
                    info!(%session_id, reason, "exit remote denied");
                    ServerFrame::ExitRemoteDenied { session_id: session_id.clone(), reason }
                }
            };
            ctx.hub.send(client_id, frame);
        }

        ClientFrame::ResumeLocal { session_id } => {
            ctx.arbiter.set_local(&session_id);
            if let Err(e) = ctx.link.resume_push(&session_id).await {
                warn!(%session_id, error = %e, "resume push failed");
            }
        }

        ClientFrame::WatchNewSession { real_path } => {
            match ctx.link.detect_new(&real_path, Some(client_id.clone())).await {
                Ok(()) => {
                    ctx.hub.send(client_id, ServerFrame::WatchStarted { real_path });
                }
                Err(e) => {
                    warn!(real_path = %real_path.display(), error = %e, "detector arm failed");
                    ctx.hub.send(
                        client_id,
                        ServerFrame::Ack { success: false, message: Some(e.to_string()) },
                    );
                }
            }
        }

        ClientFrame::FindNewSession { real_path } => {
            let frame = match ctx.link.find_new(&real_path).await {
                Ok(Some(session_id)) => ServerFrame::NewSessionFound { session_id, real_path },
                Ok(None) => ServerFrame::NewSessionNotFound { real_path },
                Err(e) => {
                    warn!(real_path = %real_path.display(), error = %e, "find probe failed");
                    ServerFrame::NewSessionNotFound { real_path }
                }
            };
            ctx.hub.send(client_id, frame);
        }

        ClientFrame::ApprovalResponse { request_id, approved, reason } => {
            ctx.approvals.remove(&request_id);
            match ctx.daemon() {
                Some(daemon) => {
                    ctx.hub.send(
                        &daemon,
                        ServerFrame::ApprovalResponse {
                            request_id,
                            approved,
                            reason,
                            client_id: Some(client_id.clone()),
                        },
                    );
                }
                None => warn!(%request_id, "approval response with no daemon attached"),
            }
        }

        ClientFrame::DaemonHello { host } => {
            if !ctx.hub.is_trusted(client_id) {
                warn!(%client_id, host, "daemon hello from untrusted source rejected");
                ctx.hub.send(
                    client_id,
                    ServerFrame::Ack { success: false, message: Some("untrusted".into()) },
                );
                return;
            }
            ctx.hub.promote_to_daemon(client_id);
            let previous = ctx.daemon_client.lock().replace(client_id.clone());
            if let Some(previous) = previous {
                debug!(%previous, "daemon uplink replaced");
            }
            info!(%client_id, host, "daemon uplink attached");
            ctx.hub.send(client_id, ServerFrame::Ack { success: true, message: None });
        }
    }
}

/// Handle one push from the daemon uplink.
pub async fn handle_daemon_frame(ctx: &Arc<ServerCtx>, frame: DaemonFrame) {
    match frame {
        DaemonFrame::NewMessage { session_id, message, .. } => {
            for subscriber in ctx.router.subscribers(&session_id) {
                ctx.hub.send(
                    &subscriber,
                    ServerFrame::NewMessage {
                        session_id: session_id.clone(),
                        message: message.clone(),
                    },
                );
            }
        }

        DaemonFrame::Metrics { session_id, metrics } => {
            let frame = ServerFrame::MetricsUpdate {
                session_id: session_id.clone(),
                connected: ctx.hub.cli_of(&session_id).is_some(),
                mode: ctx.arbiter.mode(&session_id),
                context_length: metrics.context_length,
                context_percentage: metrics.context_percentage,
                input_tokens: metrics.input_tokens,
                output_tokens: metrics.output_tokens,
                timestamp: ctx.clock.epoch_ms(),
            };
            let mut recipients = ctx.router.subscribers(&session_id);
            if let Some(cli) = ctx.hub.cli_of(&session_id) {
                if !recipients.contains(&cli) {
                    recipients.push(cli);
                }
            }
            for recipient in recipients {
                ctx.hub.send(&recipient, frame.clone());
            }
        }

        DaemonFrame::NewSessionCreated { session_id, real_path, cli_client_id } => {
            if let Some(confirmation) =
                ctx.matcher.report_daemon_session(&real_path, &session_id)
            {
                notify_confirmed(ctx, confirmation);
            }
            if let Some(watcher_cli) = cli_client_id {
                ctx.hub.send(
                    &watcher_cli,
                    ServerFrame::NewSessionCreated { session_id, real_path },
                );
            }
        }

        DaemonFrame::SessionUpdated { session_id, metadata } => {
            for subscriber in ctx.router.subscribers(&session_id) {
                ctx.hub.send(
                    &subscriber,
                    ServerFrame::SessionUpdated {
                        session_id: session_id.clone(),
                        metadata: metadata.clone(),
                    },
                );
            }
        }

        DaemonFrame::ProjectUpdated { real_path, metadata } => {
            ctx.hub.broadcast(&ServerFrame::ProjectUpdated { real_path, metadata });
        }

        DaemonFrame::ApprovalRequest {
            request_id,
            session_id,
            tool_name,
            input,
            tool_use_id,
            description,
            target_client_id,
        } => {
            // Prefer the client that originated the in-flight request, then
            // the session's most recent subscriber, then its newest mobile.
            let target = target_client_id
                .filter(|id| ctx.hub.is_connected(id))
                .or_else(|| ctx.router.most_recent(&session_id))
                .or_else(|| ctx.hub.last_mobile_of(&session_id));
            let Some(target) = target else {
                warn!(%request_id, %session_id, "approval request with no reachable mobile");
                return;
            };
            ctx.approvals.record(request_id.clone(), session_id.clone(), target.clone());
            ctx.hub.send(
                &target,
                ServerFrame::ApprovalRequest {
                    request_id,
                    session_id,
                    tool_name,
                    input,
                    tool_use_id,
                    description,
                },
            );
        }

        DaemonFrame::ApprovalTimeout { request_id, message } => {
            match ctx.approvals.remove(&request_id) {
                Some(route) => {
                    ctx.hub
                        .send(&route.target, ServerFrame::ApprovalTimeout { request_id, message });
                }
                None => {
                    ctx.hub.broadcast(&ServerFrame::ApprovalTimeout { request_id, message });
                }
            }
        }

        DaemonFrame::ApprovalExpired { request_id, message } => {
            // The hub does not know which client sent the late response.
            ctx.approvals.remove(&request_id);
            ctx.hub.broadcast(&ServerFrame::ApprovalExpired { request_id, message });
        }

        DaemonFrame::SdkError { session_id, error } => {
            for mobile in ctx.hub.mobiles_of(&session_id) {
                ctx.hub.send(
                    &mobile,
                    ServerFrame::SdkError { session_id: session_id.clone(), error: error.clone() },
                );
            }
        }
    }
}

/// Handle a connection going away.
pub async fn handle_disconnect(ctx: &Arc<ServerCtx>, client_id: &ClientId) {
    let outcome = ctx.hub.disconnect(client_id);
    if let Some(session_id) = &outcome.session_id {
        if outcome.cli_released.is_some() {
            ctx.arbiter.set_local(session_id);
        }
        if !ctx.hub.has_occupancy(session_id) {
            ctx.arbiter.forget(session_id);
        }
    }
    for (session_id, _real_path) in ctx.router.unsubscribe_all(client_id) {
        if let Err(e) = ctx.link.unwatch(&session_id).await {
            warn!(%session_id, error = %e, "watch release on disconnect failed");
        }
    }
    if outcome.was_daemon {
        let mut daemon = ctx.daemon_client.lock();
        if daemon.as_ref() == Some(client_id) {
            *daemon = None;
            warn!("daemon uplink detached");
        }
    }
    debug!(%client_id, "disconnected");
}

fn notify_confirmed(ctx: &Arc<ServerCtx>, confirmation: crate::matcher::Confirmation) {
    let Some(cli) = confirmation.cli_client_id else {
        debug!(session_id = %confirmation.session_id, "confirmed with no reporting CLI");
        return;
    };
    ctx.hub.send(&cli, ServerFrame::SessionConfirmed { session_id: confirmation.session_id });
}

/// True when `client_type` marks the daemon uplink of this context.
pub fn is_daemon_connection(ctx: &ServerCtx, client_id: &ClientId) -> bool {
    ctx.hub.client_type(client_id) == Some(ClientType::Daemon)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
