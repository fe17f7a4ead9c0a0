//! WebDriver Agent SDK - report WebDriver test runs through a local Agent.
//!
//! This crate provides:
//! - Agent session start with typed rejection errors
//! - Interception of every WebDriver command sent to a caller-supplied transport
//! - Automatic command and test reports, with find retries inside waits debounced
//! - Masking of values typed into password fields
//! - Asynchronous, ordered report delivery (individual or batched)
//! - Test, job and project inference from the call stack
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use std::time::Duration;
//! use webdriver_agent::{DriverBuilder, ScriptedTransport, Wait};
//!
//! let mut driver = DriverBuilder::new(json!({"browserName": "chrome"}))
//!     .token("my-dev-token")
//!     .start(|_session| Ok(ScriptedTransport::succeeding()))?;
//!
//! let found = Wait::new(Duration::from_secs(5)).until(&mut driver, |d| {
//!     let response = d.find_element("css selector", "#submit");
//!     response.passed().then_some(response)
//! });
//! driver.report().step("Submit button visible", None, found.is_ok());
//! driver.quit();
//! # Ok::<(), webdriver_agent::AgentError>(())
//! ```

pub mod agent;
pub mod command;
pub mod config;
pub mod driver;
pub mod executor;
pub mod report;
pub mod session;
pub mod stack;
pub mod transport;
pub mod wait;

// Re-export Agent client types
pub use agent::{AgentClient, AgentError, AgentOptions, AgentResult, ReportSettings, ReportType};

// Re-export command model
pub use command::{Command, CommandRedactor, Parameters, Platform, Response, Status, names};

// Re-export driver facade
pub use driver::{Driver, DriverBuilder};
pub use executor::CommandExecutor;

// Re-export reporting types
pub use report::{
    CommandReport, DeliveryMode, ReportItem, ReportQueue, ReportSink, Reporter, ReportingFlags,
    ReportingPipeline, StepReport, TestReport,
};

pub use session::AgentSession;
pub use stack::{CallStackInspector, FrameDescriptor, TestFramework, TestIdentity};
pub use transport::{ScriptedTransport, Transport, TransportError, TransportResult};
pub use wait::{Wait, WaitError};
