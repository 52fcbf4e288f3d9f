// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! HTTP client for the per-host daemon.
//!
//! All server→daemon traffic is plain HTTP on the internal network; the
//! daemon's pushes travel the other way on its WebSocket uplink. The trait
//! exists so dispatch logic can run against a recording fake in tests.

use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use vlaude_core::{ClientId, ProjectMeta, SessionId, SessionMeta};
use vlaude_wire::{
    ApiEnvelope, CheckLoadingBody, CreateSessionBody, DetectNewBody, FindNewBody, FoundSession,
    LoadingStatus, MessagesQuery, ResumePushBody, SendMessageBody, UnwatchBody, WatchBody,
};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("daemon unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("daemon refused: {0}")]
    Daemon(String),
}

/// Server→daemon operations.
#[async_trait]
pub trait DaemonApi: Send + Sync {
    async fn send_message(&self, body: SendMessageBody) -> Result<(), LinkError>;
    async fn check_loading(
        &self,
        session_id: &SessionId,
        real_path: &Path,
    ) -> Result<bool, LinkError>;
    async fn watch(&self, session_id: &SessionId, real_path: &Path) -> Result<(), LinkError>;
    async fn unwatch(&self, session_id: &SessionId) -> Result<(), LinkError>;
    async fn resume_push(&self, session_id: &SessionId) -> Result<(), LinkError>;
    async fn detect_new(
        &self,
        real_path: &Path,
        cli_client_id: Option<ClientId>,
    ) -> Result<(), LinkError>;
    async fn find_new(&self, real_path: &Path) -> Result<Option<SessionId>, LinkError>;
    async fn create_session(&self, body: CreateSessionBody) -> Result<(), LinkError>;

    // Store reads proxied for the REST surface. Envelopes pass through
    // untouched so pagination metadata survives.
    async fn list_projects(
        &self,
        limit: Option<usize>,
    ) -> Result<ApiEnvelope<Vec<ProjectMeta>>, LinkError>;
    async fn get_project(&self, encoded: &str) -> Result<ApiEnvelope<ProjectMeta>, LinkError>;
    async fn sessions_by_path(
        &self,
        path: &Path,
        limit: Option<usize>,
    ) -> Result<ApiEnvelope<Vec<SessionMeta>>, LinkError>;
    async fn session_by_id(
        &self,
        session_id: &SessionId,
    ) -> Result<ApiEnvelope<SessionMeta>, LinkError>;
    async fn messages(
        &self,
        session_id: &SessionId,
        query: &MessagesQuery,
    ) -> Result<ApiEnvelope<Vec<serde_json::Value>>, LinkError>;
}

/// Real link over reqwest.
pub struct DaemonLink {
    http: reqwest::Client,
    base: String,
}

impl DaemonLink {
    /// `base` like `http://127.0.0.1:8787`, no trailing slash.
    pub fn new(base: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base: base.into() }
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, LinkError> {
        let url = format!("{}{}", self.base, path);
        let envelope =
            self.http.post(&url).json(body).send().await?.json::<ApiEnvelope<T>>().await?;
        Ok(envelope)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>, LinkError> {
        let url = format!("{}{}", self.base, path);
        let envelope = self.http.get(&url).send().await?.json::<ApiEnvelope<T>>().await?;
        Ok(envelope)
    }
}

fn expect_success<T>(envelope: ApiEnvelope<T>) -> Result<Option<T>, LinkError> {
    if !envelope.success {
        return Err(LinkError::Daemon(
            envelope.message.unwrap_or_else(|| "unknown daemon error".to_string()),
        ));
    }
    Ok(envelope.data)
}

#[async_trait]
impl DaemonApi for DaemonLink {
    async fn send_message(&self, body: SendMessageBody) -> Result<(), LinkError> {
        expect_success(self.post::<_, ()>("/sessions/send-message", &body).await?)?;
        Ok(())
    }

    async fn check_loading(
        &self,
        session_id: &SessionId,
        real_path: &Path,
    ) -> Result<bool, LinkError> {
        let body = CheckLoadingBody {
            session_id: session_id.clone(),
            real_path: real_path.to_path_buf(),
        };
        let status =
            expect_success(self.post::<_, LoadingStatus>("/sessions/check-loading", &body).await?)?;
        Ok(status.map(|s| s.loading).unwrap_or(false))
    }

    async fn watch(&self, session_id: &SessionId, real_path: &Path) -> Result<(), LinkError> {
        let body =
            WatchBody { session_id: session_id.clone(), real_path: real_path.to_path_buf() };
        expect_success(self.post::<_, ()>("/sessions/watch", &body).await?)?;
        Ok(())
    }

    async fn unwatch(&self, session_id: &SessionId) -> Result<(), LinkError> {
        let body = UnwatchBody { session_id: session_id.clone() };
        expect_success(self.post::<_, ()>("/sessions/unwatch", &body).await?)?;
        Ok(())
    }

    async fn resume_push(&self, session_id: &SessionId) -> Result<(), LinkError> {
        let body = ResumePushBody { session_id: session_id.clone() };
        expect_success(self.post::<_, ()>("/sessions/resume-push", &body).await?)?;
        Ok(())
    }

    async fn detect_new(
        &self,
        real_path: &Path,
        cli_client_id: Option<ClientId>,
    ) -> Result<(), LinkError> {
        let body = DetectNewBody { real_path: real_path.to_path_buf(), cli_client_id };
        expect_success(self.post::<_, ()>("/sessions/detect-new", &body).await?)?;
        Ok(())
    }

    async fn find_new(&self, real_path: &Path) -> Result<Option<SessionId>, LinkError> {
        let body = FindNewBody { real_path: real_path.to_path_buf() };
        let found =
            expect_success(self.post::<_, FoundSession>("/sessions/find-new", &body).await?)?;
        Ok(found.and_then(|f| f.session_id))
    }

    async fn create_session(&self, body: CreateSessionBody) -> Result<(), LinkError> {
        expect_success(self.post::<_, ()>("/sessions", &body).await?)?;
        Ok(())
    }

    async fn list_projects(
        &self,
        limit: Option<usize>,
    ) -> Result<ApiEnvelope<Vec<ProjectMeta>>, LinkError> {
        let path = match limit {
            Some(limit) => format!("/projects?limit={limit}"),
            None => "/projects".to_string(),
        };
        self.get(&path).await
    }

    async fn get_project(&self, encoded: &str) -> Result<ApiEnvelope<ProjectMeta>, LinkError> {
        self.get(&format!("/projects/{encoded}")).await
    }

    async fn sessions_by_path(
        &self,
        path: &Path,
        limit: Option<usize>,
    ) -> Result<ApiEnvelope<Vec<SessionMeta>>, LinkError> {
        let mut url = format!("/sessions/by-path?path={}", urlencode(&path.to_string_lossy()));
        if let Some(limit) = limit {
            url.push_str(&format!("&limit={limit}"));
        }
        self.get(&url).await
    }

    async fn session_by_id(
        &self,
        session_id: &SessionId,
    ) -> Result<ApiEnvelope<SessionMeta>, LinkError> {
        self.get(&format!("/sessions/by-session-id/{session_id}")).await
    }

    async fn messages(
        &self,
        session_id: &SessionId,
        query: &MessagesQuery,
    ) -> Result<ApiEnvelope<Vec<serde_json::Value>>, LinkError> {
        let order = match query.order {
            vlaude_core::SortOrder::Asc => "asc",
            vlaude_core::SortOrder::Desc => "desc",
        };
        let url = format!(
            "/sessions/{}/messages?projectPath={}&limit={}&offset={}&order={}",
            session_id,
            urlencode(&query.project_path.to_string_lossy()),
            query.limit,
            query.offset,
            order,
        );
        self.get(&url).await
    }
}

/// Percent-encode the characters that matter in a query value.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
