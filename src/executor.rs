//! Command interception.
//!
//! Every driver command passes through [`CommandExecutor::execute`], which
//! runs it against the real transport and hands the outcome to the
//! reporting pipeline. Session creation never reaches the transport (the
//! Agent already created the session) and quit is reported specially.

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::command::{Command, Response, Status, normalize};
use crate::report::{Reporter, ReportingPipeline};
use crate::transport::{Transport, TransportError};

pub struct CommandExecutor {
    transport: Box<dyn Transport>,
    pipeline: ReportingPipeline,
    session_id: String,
    capabilities: Value,
    keep_session: bool,
    quit: bool,
}

impl CommandExecutor {
    /// Wrap `transport`, attached to the Agent-created `session_id`
    ///
    /// With `keep_session` the real quit is skipped so the browser stays
    /// open after teardown.
    pub fn new(
        transport: Box<dyn Transport>,
        pipeline: ReportingPipeline,
        session_id: impl Into<String>,
        capabilities: Value,
        keep_session: bool,
    ) -> Self {
        Self {
            transport,
            pipeline,
            session_id: session_id.into(),
            capabilities,
            keep_session,
            quit: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether quit has been executed
    pub fn is_quit(&self) -> bool {
        self.quit
    }

    /// Execute a command and report it
    ///
    /// Transport failures come back as failure responses, never as errors.
    pub fn execute(&mut self, mut command: Command) -> Response {
        if command.session_id.is_none() {
            command.session_id = Some(self.session_id.clone());
        }

        if command.is_new_session() {
            debug!(session_id = %self.session_id, "session already created by the Agent");
            return Response::success(Some(json!({
                "sessionId": self.session_id,
                "capabilities": self.capabilities,
            })))
            .with_session(Some(self.session_id.clone()));
        }

        if command.is_quit() {
            return self.quit(command);
        }

        if self.quit {
            debug!(command = %command.name, "command after quit");
        }

        normalize(&mut command);
        // The transport may rewrite parameters in place; report what was sent.
        let sent = command.clone();

        let mut response = self.run(&mut command);
        if response.session_id.is_none() {
            response.session_id = Some(self.session_id.clone());
        }

        self.pipeline
            .report_command(&sent, &response, &mut *self.transport);
        response
    }

    /// Explicit reporting handle
    pub fn reporter(&mut self) -> Reporter<'_> {
        Reporter::new(
            &mut self.pipeline,
            &mut *self.transport,
            Some(self.session_id.as_str()),
        )
    }

    /// Flush reporting and end the Agent session without quitting the
    /// real driver
    ///
    /// Returns the number of undelivered reports. Does nothing after quit.
    pub fn close_reporting(&mut self) -> usize {
        if self.pipeline.is_closed() {
            return 0;
        }
        self.pipeline.report_quit(&mut *self.transport);
        self.pipeline.close()
    }

    fn quit(&mut self, mut command: Command) -> Response {
        self.pipeline.report_quit(&mut *self.transport);

        let response = if self.keep_session {
            info!(session_id = %self.session_id, "keeping driver session alive, skipping quit");
            Response::success(None).with_session(Some(self.session_id.clone()))
        } else {
            self.run(&mut command)
        };

        self.quit = true;
        self.pipeline.close();
        response
    }

    fn run(&mut self, command: &mut Command) -> Response {
        match self.transport.execute(command) {
            Ok(response) => response,
            Err(e) => {
                warn!(command = %command.name, error = %e, "driver command failed");
                failure_response(&e)
            }
        }
    }
}

/// Driver-shaped failure for a transport error
fn failure_response(error: &TransportError) -> Response {
    match error {
        TransportError::Timeout(_) => Response::failure(Status::Timeout, error.to_string()),
        _ => Response::failure(Status::NoSuchElement, error.to_string()),
    }
}
