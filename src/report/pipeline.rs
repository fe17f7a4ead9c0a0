//! Per-session reporting decisions.
//!
//! The pipeline sees every executed command and decides what reaches the
//! Agent: it tracks the inferred current test, debounces find commands
//! retried inside wait helpers through a one-slot stash, masks secured
//! values and captures screenshots for failures.

use std::sync::Arc;

use tracing::{debug, warn};

use super::types::{CommandReport, ReportItem, StepReport, TestReport};
use crate::command::{Command, CommandRedactor, Response, names};
use crate::stack::CallStackInspector;
use crate::transport::Transport;

/// Destination of finished reports
pub trait ReportSink: Send + Sync {
    /// Hand a report over for delivery (non-blocking)
    fn submit(&self, item: ReportItem);

    /// End the session; returns the number of undelivered reports
    fn close(&self) -> usize;
}

/// Switches that suppress parts of the automatic reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportingFlags {
    /// Suppress every report
    pub disable_reports: bool,
    /// Suppress command reports only
    pub disable_command_reports: bool,
    /// Suppress test reports synthesized from stack inference
    pub disable_auto_test_reports: bool,
    /// Report typed values even for secured fields
    pub disable_redaction: bool,
}

/// A find command held back while a wait helper may still retry it
#[derive(Debug, Clone)]
struct StashedCommand {
    command: Command,
    response: Response,
    passed: bool,
}

impl StashedCommand {
    fn is_retry_of(&self, command: &Command) -> bool {
        self.command.name == command.name && self.command.parameters == command.parameters
    }
}

/// What the stack looked like when a report decision was made
struct StackView {
    test_name: Option<String>,
    in_retry_helper: bool,
    in_bdd_runner: bool,
}

pub struct ReportingPipeline {
    inspector: CallStackInspector,
    sink: Arc<dyn ReportSink>,
    redactor: CommandRedactor,
    flags: ReportingFlags,
    current_test: Option<String>,
    stash: Option<StashedCommand>,
    closed: bool,
}

impl ReportingPipeline {
    pub fn new(
        inspector: CallStackInspector,
        sink: Arc<dyn ReportSink>,
        redactor: CommandRedactor,
        flags: ReportingFlags,
    ) -> Self {
        Self {
            inspector,
            sink,
            redactor,
            flags,
            current_test: None,
            stash: None,
            closed: false,
        }
    }

    pub fn flags(&self) -> ReportingFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut ReportingFlags {
        &mut self.flags
    }

    /// Test the pipeline currently attributes reports to
    pub fn current_test(&self) -> Option<&str> {
        self.current_test.as_deref()
    }

    pub fn has_stashed_command(&self) -> bool {
        self.stash.is_some()
    }

    /// Decide how an executed command is reported
    ///
    /// `command` must carry the parameters as they were before the
    /// transport ran. `transport` is only used for non-reported side
    /// queries (redaction checks, failure screenshots).
    pub fn report_command(
        &mut self,
        command: &Command,
        response: &Response,
        transport: &mut dyn Transport,
    ) {
        let view = self.view_stack();
        self.track_test(&view, transport);

        if self.command_reports_disabled() {
            debug!(command = %command.name, passed = response.passed(), "command report suppressed");
            self.flush_stash(transport);
            return;
        }

        let passed = response.passed();

        if view.in_retry_helper && command.is_find_element() {
            if self.stash.as_ref().is_some_and(|s| !s.is_retry_of(command)) {
                self.flush_stash(transport);
            }
            debug!(command = %command.name, passed, "stashing command retried by wait helper");
            self.stash = Some(StashedCommand {
                command: command.clone(),
                response: response.clone(),
                passed,
            });
            return;
        }

        self.flush_stash(transport);

        let reported = if self.flags.disable_redaction {
            command.clone()
        } else {
            self.redactor.redact(command, transport)
        };
        self.emit_command(&reported, response, passed, transport);
    }

    /// Teardown reporting for a quit command
    ///
    /// The quit itself is never reported. Any stashed command is flushed
    /// and a final test report is emitted for the running test.
    pub fn report_quit(&mut self, transport: &mut dyn Transport) {
        self.flush_stash(transport);

        if let Some(test_name) = self.current_test.take() {
            self.emit_auto_test_report(test_name);
        }
    }

    /// Report an explicit user step
    pub fn report_step(&mut self, step: StepReport, transport: &mut dyn Transport) {
        self.before_explicit_report(transport);

        if self.flags.disable_reports {
            debug!(step = %step.description, passed = step.passed, "step report suppressed");
            return;
        }
        self.sink.submit(step.into());
    }

    /// Report an explicit test result
    pub fn report_test(&mut self, test: TestReport, transport: &mut dyn Transport) {
        self.before_explicit_report(transport);

        if self.flags.disable_reports {
            debug!(test = %test.name, passed = test.passed, "test report suppressed");
            return;
        }
        if !self.flags.disable_auto_test_reports {
            debug!(
                test = %test.name,
                "explicit test report while automatic test reports are enabled, the test may be reported twice"
            );
        }
        self.sink.submit(test.into());
    }

    /// Take a screenshot through a non-reported side query
    ///
    /// Returns the base64 PNG payload, or `None` when the driver could not
    /// produce one.
    pub fn capture_screenshot(
        &self,
        session_id: Option<&str>,
        transport: &mut dyn Transport,
    ) -> Option<String> {
        let mut command = Command::new(names::SCREENSHOT);
        command.session_id = session_id.map(str::to_string);

        match transport.execute(&mut command) {
            Ok(response) if response.passed() => response.value_str().map(str::to_string),
            Ok(response) => {
                warn!(status = response.status.as_str(), "screenshot failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "screenshot failed");
                None
            }
        }
    }

    /// Stop accepting reports and end the Agent session
    ///
    /// Returns the number of reports that could not be delivered. Only the
    /// first call closes the sink.
    pub fn close(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.closed = true;
        if self.stash.is_some() {
            warn!("closing with a stashed command that was never flushed");
        }
        self.sink.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn view_stack(&self) -> StackView {
        let snapshot = self.inspector.snapshot();
        StackView {
            test_name: snapshot.current_test().map(|identity| identity.test_name),
            in_retry_helper: snapshot.is_inside_retry_helper(),
            in_bdd_runner: snapshot.is_inside_bdd_runner(),
        }
    }

    fn before_explicit_report(&mut self, transport: &mut dyn Transport) {
        let view = self.view_stack();
        self.track_test(&view, transport);
        self.flush_stash(transport);
    }

    /// Follow test-name transitions, reporting the test that just ended
    fn track_test(&mut self, view: &StackView, transport: &mut dyn Transport) {
        if view.in_bdd_runner {
            return;
        }
        let Some(name) = view.test_name.as_deref() else {
            return;
        };
        if self.current_test.as_deref() == Some(name) {
            return;
        }

        // Reports stashed during the previous test belong to it.
        self.flush_stash(transport);

        let previous = self.current_test.replace(name.to_string());
        debug!(test = name, ?previous, "test boundary");
        if let Some(previous) = previous {
            self.emit_auto_test_report(previous);
        }
    }

    fn emit_auto_test_report(&self, test_name: String) {
        if self.flags.disable_reports || self.flags.disable_auto_test_reports {
            debug!(test = %test_name, "automatic test report suppressed");
            return;
        }
        self.sink.submit(TestReport::new(test_name, true, None).into());
    }

    fn command_reports_disabled(&self) -> bool {
        self.flags.disable_reports || self.flags.disable_command_reports
    }

    /// Emit the stashed command, or drop it while command reports are off
    fn flush_stash(&mut self, transport: &mut dyn Transport) {
        let Some(stashed) = self.stash.take() else {
            return;
        };
        if self.command_reports_disabled() {
            debug!(command = %stashed.command.name, "dropping stashed command, command reports are disabled");
            return;
        }
        debug!(command = %stashed.command.name, passed = stashed.passed, "flushing stashed command");
        self.emit_command(&stashed.command, &stashed.response, stashed.passed, transport);
    }

    fn emit_command(
        &self,
        command: &Command,
        response: &Response,
        passed: bool,
        transport: &mut dyn Transport,
    ) {
        let screenshot = if passed {
            None
        } else {
            self.capture_screenshot(command.session_id.as_deref(), transport)
        };
        let report = CommandReport::new(command, response, passed).with_screenshot(screenshot);
        self.sink.submit(report.into());
    }
}
