//! Agent session client.
//!
//! Starts the development session synchronously (the one place where
//! failures reach the caller) and then owns the report queue through which
//! every report is delivered.

use std::time::Duration;

use semver::Version;
use serde_json::Value;
use tracing::{info, warn};

use super::http::AgentHttp;
use super::types::{
    AgentError, AgentResult, ReportSettings, SDK_VERSION, SESSION_ENDPOINT, SessionRequest,
    SessionResponse,
};
use crate::config::Config;
use crate::report::pipeline::ReportSink;
use crate::report::queue::{DeliveryMode, ReportQueue};
use crate::report::types::ReportItem;
use crate::session::AgentSession;

/// Oldest Agent version that accepts batched reports
pub const MIN_BATCH_AGENT_VERSION: Version = Version::new(0, 64, 40);

/// Connection options for an Agent session
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub url: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub session_timeout: Duration,
    pub request_timeout: Duration,
    pub batch_size: usize,
    pub drain_timeout: Duration,
}

impl AgentOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.agent.url.clone(),
            token: config.agent.token.clone(),
            connect_timeout: config.agent.connect_timeout(),
            session_timeout: config.agent.session_timeout(),
            request_timeout: Duration::from_secs(config.reports.request_timeout),
            batch_size: config.reports.batch_size,
            drain_timeout: config.reports.drain_timeout(),
        }
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::from_config(crate::config::get())
    }
}

/// Handle on a running Agent session
pub struct AgentClient {
    http: AgentHttp,
    session: AgentSession,
    queue: ReportQueue,
    mode: DeliveryMode,
}

impl AgentClient {
    /// Start a development session and the report queue
    ///
    /// Fails before any network I/O when no token is available.
    pub fn start_session(
        options: &AgentOptions,
        capabilities: Value,
        report: &ReportSettings,
    ) -> AgentResult<Self> {
        let token = options
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AgentError::MissingToken)?;

        let http = AgentHttp::new(
            &options.url,
            token,
            options.connect_timeout,
            options.request_timeout,
        )?;

        info!(
            url = http.base_url(),
            project = %report.project_name,
            job = %report.job_name,
            "starting Agent session"
        );

        let request = SessionRequest::new(capabilities, report);
        let response = http
            .post_json(SESSION_ENDPOINT, &request, Some(options.session_timeout))
            .map_err(|e| AgentError::Connect {
                url: http.base_url().to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(map_rejection(status.as_u16(), &body, http.base_url()));
        }

        let accepted: SessionResponse =
            serde_json::from_str(&body).map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
        let session = AgentSession::new(accepted, report);

        let mode = if supports_batching(session.agent_version.as_deref()) {
            DeliveryMode::for_batch_size(options.batch_size)
        } else {
            DeliveryMode::Individual
        };
        let queue = ReportQueue::start(http.clone(), mode, options.drain_timeout);

        info!(
            session_id = %session.session_id,
            server = %session.server_address,
            agent_version = session.agent_version.as_deref().unwrap_or("unknown"),
            ?mode,
            "Agent session started"
        );

        Ok(Self {
            http,
            session,
            queue,
            mode,
        })
    }

    pub fn session(&self) -> &AgentSession {
        &self.session
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn agent_url(&self) -> &str {
        self.http.base_url()
    }

    /// Queue a report for delivery
    pub fn report(&self, item: ReportItem) {
        self.queue.submit(item);
    }

    /// Drain the report queue and end the session
    ///
    /// Returns the number of reports that could not be delivered.
    pub fn stop(&self) -> usize {
        if self.queue.is_stopped() {
            return self.queue.pending();
        }
        let undelivered = self.queue.stop();
        let duration_ms = self.session.elapsed().num_milliseconds();
        if undelivered == 0 {
            info!(session_id = %self.session.session_id, duration_ms, "Agent session stopped");
        } else {
            warn!(
                session_id = %self.session.session_id,
                duration_ms,
                undelivered,
                "Agent session stopped with undelivered reports"
            );
        }
        undelivered
    }
}

impl ReportSink for AgentClient {
    fn submit(&self, item: ReportItem) {
        self.report(item);
    }

    fn close(&self) -> usize {
        self.stop()
    }
}

/// Whether an Agent of this version accepts the batch endpoint
pub fn supports_batching(agent_version: Option<&str>) -> bool {
    agent_version
        .and_then(|v| Version::parse(v.trim()).ok())
        .is_some_and(|v| v >= MIN_BATCH_AGENT_VERSION)
}

fn map_rejection(status: u16, body: &str, url: &str) -> AgentError {
    let message = error_message(body);
    match status {
        401 => AgentError::Unauthorized,
        404 => AgentError::BrowserUnavailable(message),
        406 => AgentError::UnsupportedSdkVersion {
            sdk_version: SDK_VERSION.to_string(),
            message,
        },
        _ => AgentError::Connect {
            url: url.to_string(),
            reason: format!("HTTP {status}: {message}"),
        },
    }
}

/// The Agent's `message` field when the body is JSON, the raw body otherwise
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
