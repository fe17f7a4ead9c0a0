//! Driver facade.
//!
//! A [`Driver`] is started through a [`DriverBuilder`]: the builder opens
//! the Agent session, then asks the caller to connect the real WebDriver
//! transport to the server the Agent prepared. From then on every command
//! is intercepted and reported.
//!
//! ```no_run
//! use serde_json::json;
//! use webdriver_agent::{DriverBuilder, ScriptedTransport};
//!
//! let mut driver = DriverBuilder::new(json!({"browserName": "chrome"}))
//!     .project_name("shop")
//!     .start(|_session| Ok(ScriptedTransport::succeeding()))?;
//!
//! driver.find_element("css selector", "#login");
//! driver.report().step("Opened login page", None, true);
//! driver.quit();
//! # Ok::<(), webdriver_agent::AgentError>(())
//! ```

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::agent::{
    AgentClient, AgentOptions, AgentResult, ReportSettings, ReportType, UNNAMED_JOB,
    UNNAMED_PROJECT,
};
use crate::command::{Command, CommandRedactor, Response, names};
use crate::config;
use crate::executor::CommandExecutor;
use crate::report::{DeliveryMode, Reporter, ReportSink, ReportingFlags, ReportingPipeline};
use crate::session::AgentSession;
use crate::stack::CallStackInspector;
use crate::transport::{Transport, TransportResult};

/// Configures and starts a [`Driver`]
pub struct DriverBuilder {
    capabilities: Value,
    project_name: Option<String>,
    job_name: Option<String>,
    report_type: ReportType,
    token: Option<String>,
    agent_url: Option<String>,
    flags: ReportingFlags,
    keep_session: Option<bool>,
    inspector: Option<CallStackInspector>,
    options: Option<AgentOptions>,
}

impl DriverBuilder {
    /// Builder requesting a session with `capabilities`
    pub fn new(capabilities: Value) -> Self {
        Self {
            capabilities,
            project_name: None,
            job_name: None,
            report_type: ReportType::default(),
            token: None,
            agent_url: None,
            flags: ReportingFlags::default(),
            keep_session: None,
            inspector: None,
            options: None,
        }
    }

    /// Builder for a desktop browser by name ("chrome", "firefox", ...)
    pub fn browser(name: &str) -> Self {
        Self::new(json!({ "browserName": name }))
    }

    /// Project the report is filed under (inferred when absent)
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Job the report is filed under (inferred when absent)
    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn report_type(mut self, report_type: ReportType) -> Self {
        self.report_type = report_type;
        self
    }

    /// Developer token (defaults to `TP_DEV_TOKEN`)
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Agent base URL (defaults to `TP_AGENT_URL`)
    pub fn agent_url(mut self, url: impl Into<String>) -> Self {
        self.agent_url = Some(url.into());
        self
    }

    pub fn disable_reports(mut self, disabled: bool) -> Self {
        self.flags.disable_reports = disabled;
        self
    }

    pub fn reporting_flags(mut self, flags: ReportingFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Skip the real quit (defaults to `TP_KEEP_DRIVER_SESSION`)
    pub fn keep_session(mut self, keep: bool) -> Self {
        self.keep_session = Some(keep);
        self
    }

    /// Stack inspector used for test inference
    pub fn inspector(mut self, inspector: CallStackInspector) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Connection options (defaults to the environment configuration)
    pub fn options(mut self, options: AgentOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Start the Agent session and connect the real driver
    ///
    /// `connect` receives the accepted session and builds the transport to
    /// its `server_address`. If it fails the Agent session is stopped again.
    pub fn start<T, F>(self, connect: F) -> AgentResult<Driver>
    where
        T: Transport + 'static,
        F: FnOnce(&AgentSession) -> TransportResult<T>,
    {
        let inspector = self.inspector.unwrap_or_default();
        let report = resolve_report_settings(
            &inspector,
            self.project_name,
            self.job_name,
            self.report_type,
        );

        let mut options = self.options.unwrap_or_default();
        if let Some(token) = self.token {
            options.token = Some(token);
        }
        if let Some(url) = self.agent_url {
            options.url = url;
        }

        let client = Arc::new(AgentClient::start_session(
            &options,
            self.capabilities,
            &report,
        )?);

        let transport = match connect(client.session()) {
            Ok(transport) => transport,
            Err(e) => {
                client.stop();
                return Err(e.into());
            }
        };

        let session = client.session().clone();
        let sink: Arc<dyn ReportSink> = client.clone();
        let pipeline = ReportingPipeline::new(
            inspector,
            sink,
            CommandRedactor::new(session.platform()),
            self.flags,
        );
        let keep_session = self
            .keep_session
            .unwrap_or_else(|| config::get().driver.keep_session);

        let executor = CommandExecutor::new(
            Box::new(transport),
            pipeline,
            session.session_id.clone(),
            session.capabilities.clone(),
            keep_session,
        );

        Ok(Driver {
            executor,
            client,
            session,
        })
    }
}

/// Explicit names win; otherwise infer from the calling test
fn resolve_report_settings(
    inspector: &CallStackInspector,
    project_name: Option<String>,
    job_name: Option<String>,
    report_type: ReportType,
) -> ReportSettings {
    let inferred = if project_name.is_none() || job_name.is_none() {
        inspector.infer_current_test()
    } else {
        None
    };
    debug!(?inferred, "resolving report names");

    let project = project_name
        .or_else(|| inferred.as_ref().map(|i| i.project_name.clone()))
        .unwrap_or_else(|| UNNAMED_PROJECT.to_string());
    let job = job_name
        .or_else(|| inferred.as_ref().map(|i| i.job_name.clone()))
        .unwrap_or_else(|| UNNAMED_JOB.to_string());

    ReportSettings::new(project, job).report_type(report_type)
}

/// A WebDriver session whose commands are reported to the Agent
pub struct Driver {
    executor: CommandExecutor,
    client: Arc<AgentClient>,
    session: AgentSession,
}

impl Driver {
    pub fn session(&self) -> &AgentSession {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        self.executor.session_id()
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.client.delivery_mode()
    }

    /// Execute any WebDriver command
    pub fn execute(&mut self, command: Command) -> Response {
        self.executor.execute(command)
    }

    /// Locate an element
    pub fn find_element(&mut self, using: &str, value: &str) -> Response {
        self.execute(
            Command::new(names::FIND_ELEMENT)
                .param("using", using)
                .param("value", value),
        )
    }

    /// Click an element
    pub fn click(&mut self, element_id: &str) -> Response {
        self.execute(Command::new(names::CLICK_ELEMENT).param("id", element_id))
    }

    /// Type text into an element
    pub fn send_keys(&mut self, element_id: &str, text: &str) -> Response {
        self.execute(
            Command::new(names::SEND_KEYS_TO_ELEMENT)
                .param("id", element_id)
                .param("value", json!([text])),
        )
    }

    /// Take a screenshot (reported like any other command)
    ///
    /// Returns the base64 PNG payload.
    pub fn screenshot(&mut self) -> Option<String> {
        let response = self.execute(Command::new(names::SCREENSHOT));
        response.value_str().map(str::to_string)
    }

    /// Explicit step and test reporting
    pub fn report(&mut self) -> Reporter<'_> {
        self.executor.reporter()
    }

    /// Quit the driver and end the Agent session
    pub fn quit(mut self) -> Response {
        self.executor.execute(Command::new(names::QUIT))
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if !self.executor.is_quit() {
            debug!(session_id = %self.session.session_id, "driver dropped without quit, flushing reports");
            self.executor.close_reporting();
        }
    }
}
