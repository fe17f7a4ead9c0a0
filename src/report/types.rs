// Report records delivered to the Agent

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{Command, Parameters, Response};

/// Agent endpoint paths for each report kind
pub mod endpoints {
    pub const COMMAND: &str = "/api/development/report/command";
    pub const STEP: &str = "/api/development/report/step";
    pub const TEST: &str = "/api/development/report/test";
    pub const BATCH: &str = "/api/development/report/batch";
}

/// Report of one executed driver command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReport {
    pub command_name: String,
    pub command_parameters: Parameters,
    pub result: Value,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl CommandReport {
    /// Build a report from a command and the response it produced
    pub fn new(command: &Command, response: &Response, passed: bool) -> Self {
        Self {
            command_name: command.name.clone(),
            command_parameters: command.parameters.clone(),
            result: response.value.clone().unwrap_or(Value::Null),
            passed,
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Option<String>) -> Self {
        self.screenshot = screenshot;
        self
    }
}

/// Report of an explicit user step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub guid: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl StepReport {
    /// Create a step with a fresh identifier
    pub fn new(description: impl Into<String>, message: Option<String>, passed: bool) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            message,
            passed,
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Option<String>) -> Self {
        self.screenshot = screenshot;
        self
    }
}

/// Report of a finished test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestReport {
    pub fn new(name: impl Into<String>, passed: bool, message: Option<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            message,
        }
    }
}

/// Any report destined for the Agent, tagged for batch submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReportItem {
    Command(CommandReport),
    Step(StepReport),
    Test(TestReport),
}

impl ReportItem {
    /// Endpoint used when the item is sent on its own
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReportItem::Command(_) => endpoints::COMMAND,
            ReportItem::Step(_) => endpoints::STEP,
            ReportItem::Test(_) => endpoints::TEST,
        }
    }

    /// Untagged body for the single-item endpoints
    pub fn body(&self) -> serde_json::Result<Value> {
        match self {
            ReportItem::Command(report) => serde_json::to_value(report),
            ReportItem::Step(report) => serde_json::to_value(report),
            ReportItem::Test(report) => serde_json::to_value(report),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportItem::Command(_) => "command",
            ReportItem::Step(_) => "step",
            ReportItem::Test(_) => "test",
        }
    }
}

impl From<CommandReport> for ReportItem {
    fn from(report: CommandReport) -> Self {
        ReportItem::Command(report)
    }
}

impl From<StepReport> for ReportItem {
    fn from(report: StepReport) -> Self {
        ReportItem::Step(report)
    }
}

impl From<TestReport> for ReportItem {
    fn from(report: TestReport) -> Self {
        ReportItem::Test(report)
    }
}

/// Errors raised while uploading reports
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The Agent answered with a non-2xx status
    #[error("Agent returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request could not be sent
    #[error("Report request failed: {0}")]
    Request(String),

    /// The report could not be serialized
    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
