// Explicit step and test reporting for user code

use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::pipeline::ReportingPipeline;
use super::types::{StepReport, TestReport};
use crate::transport::Transport;

/// Handle for reporting steps and tests by hand
///
/// Obtained from `Driver::report()`. Explicit reports go through the same
/// pipeline as command reports, so they stay in order with them.
pub struct Reporter<'a> {
    pipeline: &'a mut ReportingPipeline,
    transport: &'a mut dyn Transport,
    session_id: Option<&'a str>,
}

impl<'a> Reporter<'a> {
    pub fn new(
        pipeline: &'a mut ReportingPipeline,
        transport: &'a mut dyn Transport,
        session_id: Option<&'a str>,
    ) -> Self {
        Self {
            pipeline,
            transport,
            session_id,
        }
    }

    /// Report a step
    pub fn step(&mut self, description: &str, message: Option<&str>, passed: bool) {
        let step = StepReport::new(description, message.map(str::to_string), passed);
        self.pipeline.report_step(step, self.transport);
    }

    /// Report a step with a screenshot of the current screen
    pub fn step_with_screenshot(&mut self, description: &str, message: Option<&str>, passed: bool) {
        let screenshot = self
            .pipeline
            .capture_screenshot(self.session_id, self.transport);
        let step = StepReport::new(description, message.map(str::to_string), passed)
            .with_screenshot(screenshot);
        self.pipeline.report_step(step, self.transport);
    }

    /// Report a step with caller-supplied PNG bytes
    pub fn step_with_image(
        &mut self,
        description: &str,
        message: Option<&str>,
        passed: bool,
        png: &[u8],
    ) {
        let step = StepReport::new(description, message.map(str::to_string), passed)
            .with_screenshot(Some(STANDARD.encode(png)));
        self.pipeline.report_step(step, self.transport);
    }

    /// Report a test result
    pub fn test(&mut self, name: &str, passed: bool, message: Option<&str>) {
        let test = TestReport::new(name, passed, message.map(str::to_string));
        self.pipeline.report_test(test, self.transport);
    }

    pub fn disable_reports(&mut self, disabled: bool) {
        self.pipeline.flags_mut().disable_reports = disabled;
    }

    pub fn disable_command_reports(&mut self, disabled: bool) {
        self.pipeline.flags_mut().disable_command_reports = disabled;
    }

    pub fn disable_auto_test_reports(&mut self, disabled: bool) {
        self.pipeline.flags_mut().disable_auto_test_reports = disabled;
    }

    pub fn disable_redaction(&mut self, disabled: bool) {
        self.pipeline.flags_mut().disable_redaction = disabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandRedactor, Platform, Response, names};
    use crate::report::pipeline::ReportingFlags;
    use crate::report::pipeline::tests::{FakeStack, RecordingSink};
    use crate::report::types::ReportItem;
    use crate::transport::ScriptedTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (ReportingPipeline, Arc<RecordingSink>, FakeStack) {
        let stack = FakeStack::default();
        stack.set(&[
            "shop::cart::tests::adds_item",
            "test::__rust_begin_short_backtrace",
        ]);
        let sink = Arc::new(RecordingSink::default());
        let pipeline = ReportingPipeline::new(
            stack.inspector(),
            sink.clone(),
            CommandRedactor::new(Platform::Web),
            ReportingFlags::default(),
        );
        (pipeline, sink, stack)
    }

    #[test]
    fn test_step_and_test_reports() {
        let (mut pipeline, sink, _stack) = setup();
        let mut transport = ScriptedTransport::succeeding();

        let mut reporter = Reporter::new(&mut pipeline, &mut transport, Some("s-1"));
        reporter.step("open cart", Some("cart is empty"), true);
        reporter.test("adds_item", false, Some("price mismatch"));

        let items = sink.items();
        assert_eq!(items.len(), 2);
        match &items[0] {
            ReportItem::Step(step) => {
                assert_eq!(step.description, "open cart");
                assert_eq!(step.message.as_deref(), Some("cart is empty"));
                assert!(step.screenshot.is_none());
            }
            other => panic!("unexpected report {other:?}"),
        }
        assert_eq!(
            items[1],
            ReportItem::Test(TestReport::new("adds_item", false, Some("price mismatch".into())))
        );
    }

    #[test]
    fn test_step_with_screenshot_queries_driver() {
        let (mut pipeline, sink, _stack) = setup();
        let mut transport = ScriptedTransport::new(|command| {
            assert_eq!(command.name, names::SCREENSHOT);
            Ok(Response::success(Some(json!("c2NyZWVu"))))
        });
        let log = transport.log();

        Reporter::new(&mut pipeline, &mut transport, Some("s-1"))
            .step_with_screenshot("checkout page", None, true);

        match &sink.items()[0] {
            ReportItem::Step(step) => assert_eq!(step.screenshot.as_deref(), Some("c2NyZWVu")),
            other => panic!("unexpected report {other:?}"),
        }
        assert_eq!(log.lock().unwrap()[0].session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_step_with_image_is_base64() {
        let (mut pipeline, sink, _stack) = setup();
        let mut transport = ScriptedTransport::succeeding();

        Reporter::new(&mut pipeline, &mut transport, None).step_with_image(
            "logo",
            None,
            true,
            b"\x89PNG",
        );

        match &sink.items()[0] {
            ReportItem::Step(step) => assert_eq!(step.screenshot.as_deref(), Some("iVBORw==")),
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn test_flags_are_applied_to_pipeline() {
        let (mut pipeline, sink, _stack) = setup();
        let mut transport = ScriptedTransport::succeeding();

        let mut reporter = Reporter::new(&mut pipeline, &mut transport, None);
        reporter.disable_command_reports(true);
        reporter.disable_auto_test_reports(true);
        reporter.disable_redaction(true);
        reporter.disable_reports(true);
        reporter.step("hidden", None, true);

        assert!(sink.items().is_empty());
        assert_eq!(
            pipeline.flags(),
            ReportingFlags {
                disable_reports: true,
                disable_command_reports: true,
                disable_auto_test_reports: true,
                disable_redaction: true,
            }
        );
    }
}
