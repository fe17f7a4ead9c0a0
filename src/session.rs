//! The Agent session a driver runs in.
//!
//! Created once the Agent accepted a session start. The Agent has already
//! created the real WebDriver session at `server_address`, so the driver
//! only attaches to it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::agent::{ReportSettings, ReportType, SessionResponse};
use crate::command::Platform;

/// A running Agent session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    /// WebDriver session created by the Agent
    pub session_id: String,
    /// Address of the WebDriver server to connect the transport to
    pub server_address: String,
    /// Port of the Agent's keep-alive socket, if it opened one
    pub dev_socket_port: Option<u16>,
    /// Protocol dialect (e.g. "W3C")
    pub dialect: Option<String>,
    /// Capabilities negotiated by the Agent
    pub capabilities: Value,
    /// Agent version, if reported
    pub agent_version: Option<String>,
    pub project_name: String,
    pub job_name: String,
    pub report_type: ReportType,
    /// When the session was accepted
    pub started_at: DateTime<Utc>,
}

impl AgentSession {
    /// Build the session record from the Agent's answer
    pub fn new(response: SessionResponse, report: &ReportSettings) -> Self {
        Self {
            session_id: response.session_id,
            server_address: response.server_address,
            dev_socket_port: response.dev_socket_port,
            dialect: response.dialect,
            capabilities: response.capabilities,
            agent_version: response.version,
            project_name: report.project_name.clone(),
            job_name: report.job_name.clone(),
            report_type: report.report_type,
            started_at: Utc::now(),
        }
    }

    /// Kind of application under test
    pub fn platform(&self) -> Platform {
        Platform::from_capabilities(&self.capabilities)
    }

    /// Time since the session was accepted
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(capabilities: Value) -> SessionResponse {
        SessionResponse {
            dev_socket_port: Some(9000),
            server_address: "http://localhost:4444".into(),
            session_id: "abc".into(),
            dialect: Some("W3C".into()),
            capabilities,
            version: Some("0.64.41".into()),
        }
    }

    #[test]
    fn test_session_from_response() {
        let session = AgentSession::new(
            response(json!({"platformName": "Android"})),
            &ReportSettings::new("shop", "login"),
        );
        assert_eq!(session.session_id, "abc");
        assert_eq!(session.project_name, "shop");
        assert_eq!(session.platform(), Platform::Android);
        assert!(session.elapsed() >= chrono::Duration::zero());
    }

    #[test]
    fn test_session_serializes_for_display() {
        let session = AgentSession::new(response(json!({})), &ReportSettings::default());
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["sessionId"], json!("abc"));
        assert_eq!(value["agentVersion"], json!("0.64.41"));
        assert_eq!(value["reportType"], json!("CLOUD_AND_LOCAL"));
        assert!(value["startedAt"].is_string());
    }
}
