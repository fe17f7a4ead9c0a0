// Agent session wire types and errors

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transport::TransportError;

/// Version of this SDK, announced to the Agent
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language announced to the Agent
pub const SDK_LANGUAGE: &str = "Rust";

/// Session start endpoint
pub const SESSION_ENDPOINT: &str = "/api/development/session";

/// Fallback names when neither the caller nor stack inference provide one
pub const UNNAMED_PROJECT: &str = "Unnamed Project";
pub const UNNAMED_JOB: &str = "Unnamed Job";

/// Result type for Agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while starting an Agent session
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No developer token was supplied or found in the environment
    #[error("No developer token provided, set TP_DEV_TOKEN or pass one explicitly")]
    MissingToken,

    /// Invalid SDK configuration (e.g., malformed Agent URL)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The Agent rejected the developer token
    #[error("The Agent rejected the developer token")]
    Unauthorized,

    /// The requested browser is not installed or cannot be started
    #[error("Requested browser is not available: {0}")]
    BrowserUnavailable(String),

    /// The Agent does not support this SDK version
    #[error("SDK version {sdk_version} is not supported by the Agent: {message}")]
    UnsupportedSdkVersion { sdk_version: String, message: String },

    /// The Agent could not be reached or refused the session
    #[error("Failed to start a session with the Agent at {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The Agent answered with a body that could not be understood
    #[error("Invalid Agent response: {0}")]
    InvalidResponse(String),

    /// The real driver could not be reached after the session started
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Where the Agent stores the execution report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Local,
    Cloud,
    #[default]
    CloudAndLocal,
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "local" => Ok(ReportType::Local),
            "cloud" => Ok(ReportType::Cloud),
            "cloudandlocal" => Ok(ReportType::CloudAndLocal),
            other => Err(format!("unknown report type '{other}'")),
        }
    }
}

/// Names the report is filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    pub project_name: String,
    pub job_name: String,
    pub report_type: ReportType,
}

impl ReportSettings {
    pub fn new(project_name: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            job_name: job_name.into(),
            report_type: ReportType::default(),
        }
    }

    pub fn report_type(mut self, report_type: ReportType) -> Self {
        self.report_type = report_type;
        self
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::new(UNNAMED_PROJECT, UNNAMED_JOB)
    }
}

/// Body of the session start request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub capabilities: Value,
    pub sdk_version: String,
    pub language: String,
    pub project_name: String,
    pub job_name: String,
    pub report_type: ReportType,
}

impl SessionRequest {
    pub fn new(capabilities: Value, report: &ReportSettings) -> Self {
        Self {
            capabilities,
            sdk_version: SDK_VERSION.to_string(),
            language: SDK_LANGUAGE.to_string(),
            project_name: report.project_name.clone(),
            job_name: report.job_name.clone(),
            report_type: report.report_type,
        }
    }
}

/// Agent answer to a successful session start
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Port of the Agent's keep-alive socket
    #[serde(default)]
    pub dev_socket_port: Option<u16>,
    /// Address of the WebDriver server the Agent prepared
    pub server_address: String,
    /// Driver session already created by the Agent
    pub session_id: String,
    #[serde(default)]
    pub dialect: Option<String>,
    /// Capabilities negotiated by the Agent
    #[serde(default)]
    pub capabilities: Value,
    /// Agent version
    #[serde(default)]
    pub version: Option<String>,
}
