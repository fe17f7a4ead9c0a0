//! Best-effort inference of the running test from the live call stack.
//!
//! The inspector never fails: when nothing recognizable is on the stack the
//! caller simply gets `None` and no test boundary is reported.

use std::backtrace::Backtrace;

use tracing::trace;

use super::frame::{FrameDescriptor, parse_backtrace};
use super::framework::TestFramework;

/// Name of this crate as it appears in symbol paths
const SDK_CRATE: &str = env!("CARGO_CRATE_NAME");

/// Path prefix of the bundled polling helper
const WAIT_HELPER: &str = concat!(env!("CARGO_CRATE_NAME"), "::wait::Wait::until");

/// Path prefixes of supported BDD runners
const BDD_RUNNERS: &[&str] = &["cucumber::"];

/// Source of stack frames, innermost first
pub trait FrameSource: Send {
    fn frames(&self) -> Vec<FrameDescriptor>;
}

/// Frames from a freshly captured `std::backtrace::Backtrace`
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceSource;

impl FrameSource for BacktraceSource {
    fn frames(&self) -> Vec<FrameDescriptor> {
        parse_backtrace(&Backtrace::force_capture().to_string())
    }
}

impl<F> FrameSource for F
where
    F: Fn() -> Vec<FrameDescriptor> + Send,
{
    fn frames(&self) -> Vec<FrameDescriptor> {
        self()
    }
}

/// Names inferred for the running test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    /// Test function name
    pub test_name: String,
    /// Enclosing module or type
    pub job_name: String,
    /// Crate the test lives in
    pub project_name: String,
}

impl TestIdentity {
    fn from_frame(frame: &FrameDescriptor) -> Self {
        Self {
            test_name: frame.function().to_string(),
            job_name: frame.enclosing_name().to_string(),
            project_name: frame.crate_name().to_string(),
        }
    }
}

/// Inspects the call stack for test entry points, retry helpers and BDD runners
pub struct CallStackInspector {
    source: Box<dyn FrameSource>,
    frameworks: Vec<TestFramework>,
    retry_markers: Vec<String>,
    bdd_markers: Vec<String>,
}

impl CallStackInspector {
    /// Inspector over the live backtrace with all supported frameworks
    pub fn new() -> Self {
        Self::with_source(BacktraceSource)
    }

    /// Inspector over a custom frame source
    pub fn with_source(source: impl FrameSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            frameworks: TestFramework::ALL.to_vec(),
            retry_markers: vec![WAIT_HELPER.to_string()],
            bdd_markers: BDD_RUNNERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Restrict recognition to the given frameworks, in priority order
    pub fn frameworks(mut self, frameworks: impl IntoIterator<Item = TestFramework>) -> Self {
        self.frameworks = frameworks.into_iter().collect();
        self
    }

    /// Treat frames under `prefix` as a retrying wait helper
    pub fn retry_marker(mut self, prefix: impl Into<String>) -> Self {
        self.retry_markers.push(prefix.into());
        self
    }

    /// Treat frames under `prefix` as a BDD runner
    pub fn bdd_marker(mut self, prefix: impl Into<String>) -> Self {
        self.bdd_markers.push(prefix.into());
        self
    }

    /// Capture the stack once for several queries
    pub fn snapshot(&self) -> StackSnapshot<'_> {
        StackSnapshot {
            frames: self.source.frames(),
            inspector: self,
        }
    }

    /// Infer the running test's name, job and project
    pub fn infer_current_test(&self) -> Option<TestIdentity> {
        self.snapshot().current_test()
    }

    /// Whether execution is nested inside a retrying wait helper
    pub fn is_inside_retry_helper(&self) -> bool {
        self.snapshot().is_inside_retry_helper()
    }

    /// Whether execution is nested inside a BDD step runner
    pub fn is_inside_bdd_runner(&self) -> bool {
        self.snapshot().is_inside_bdd_runner()
    }
}

impl Default for CallStackInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames captured at one point in time
pub struct StackSnapshot<'a> {
    frames: Vec<FrameDescriptor>,
    inspector: &'a CallStackInspector,
}

impl StackSnapshot<'_> {
    /// First frame, innermost outward, claimed by a supported framework;
    /// otherwise the innermost frame from the entry crate.
    pub fn current_test(&self) -> Option<TestIdentity> {
        for (idx, frame) in self.frames.iter().enumerate() {
            if frame.is_runtime() {
                continue;
            }
            let caller = self.caller_of(idx);
            if let Some(framework) = self
                .inspector
                .frameworks
                .iter()
                .find(|fw| fw.is_test_entry_point(frame, caller))
            {
                trace!(framework = framework.name(), test = %frame.symbol, "test entry point");
                return Some(TestIdentity::from_frame(frame));
            }
        }

        self.entry_crate_frame().map(TestIdentity::from_frame)
    }

    pub fn is_inside_retry_helper(&self) -> bool {
        self.any_frame_under(&self.inspector.retry_markers)
    }

    pub fn is_inside_bdd_runner(&self) -> bool {
        self.any_frame_under(&self.inspector.bdd_markers)
    }

    fn any_frame_under(&self, prefixes: &[String]) -> bool {
        self.frames
            .iter()
            .any(|f| prefixes.iter().any(|p| f.symbol.starts_with(p.as_str())))
    }

    /// Nearest outer frame that is neither the same function nor plumbing
    fn caller_of(&self, idx: usize) -> Option<&FrameDescriptor> {
        let frame = &self.frames[idx];
        self.frames[idx + 1..]
            .iter()
            .find(|f| !f.same_function(frame) && !f.is_runtime())
    }

    /// Innermost user frame from the crate that owns the outermost frame
    fn entry_crate_frame(&self) -> Option<&FrameDescriptor> {
        let is_user = |f: &&FrameDescriptor| {
            f.segments.len() > 1
                && !f.is_runtime()
                && !TestFramework::ALL.iter().any(|fw| f.in_crate(fw.runner_crate()))
        };

        let entry_crate = self.frames.iter().rev().find(is_user)?.crate_name();
        if entry_crate == SDK_CRATE {
            return None;
        }
        self.frames
            .iter()
            .filter(is_user)
            .find(|f| f.in_crate(entry_crate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frames(symbols: &[&str]) -> Vec<FrameDescriptor> {
        symbols.iter().map(|s| FrameDescriptor::parse(s)).collect()
    }

    fn inspector(symbols: &'static [&'static str]) -> CallStackInspector {
        CallStackInspector::with_source(move || frames(symbols))
    }

    const LIBTEST_STACK: &[&str] = &[
        "webdriver_agent::report::pipeline::ReportingPipeline::report_command",
        "webdriver_agent::executor::CommandExecutor::execute",
        "shop::pages::LoginPage::submit",
        "shop::login::tests::valid_credentials",
        "shop::login::tests::valid_credentials::{{closure}}",
        "core::ops::function::FnOnce::call_once",
        "test::__rust_begin_short_backtrace",
        "test::run_test_in_process",
        "std::thread::Builder::spawn_unchecked_",
    ];

    #[test]
    fn test_infers_libtest_function() {
        let identity = inspector(LIBTEST_STACK).infer_current_test().unwrap();
        assert_eq!(
            identity,
            TestIdentity {
                test_name: "valid_credentials".into(),
                job_name: "login".into(),
                project_name: "shop".into(),
            }
        );
    }

    #[test]
    fn test_infers_through_libtest_wrapper_frames() {
        let identity = inspector(&[
            "std::backtrace::Backtrace::force_capture",
            "webdriver_agent::stack::inspector::CallStackInspector::infer_current_test",
            "shop::login::tests::valid_credentials",
            "shop::login::tests::valid_credentials::{{closure}}",
            "core::ops::function::FnOnce::call_once",
            "<fn() -> core::result::Result<(), alloc::string::String> as core::ops::function::FnOnce<()>>::call_once",
            "test::__rust_begin_short_backtrace::<core::result::Result<(), alloc::string::String>, fn() -> core::result::Result<(), alloc::string::String>>",
            "test::run_test_in_process",
            "std::sys::backtrace::__rust_begin_short_backtrace::<test::run_test::{closure#0}, ()>",
            "std::thread::Builder::spawn_unchecked_::{closure#1}::{closure#0}",
        ])
        .infer_current_test()
        .unwrap();
        assert_eq!(
            identity,
            TestIdentity {
                test_name: "valid_credentials".into(),
                job_name: "login".into(),
                project_name: "shop".into(),
            }
        );
    }

    #[test]
    fn test_infers_async_test_body() {
        let identity = inspector(&[
            "webdriver_agent::executor::CommandExecutor::execute",
            "shop::tests::checkout::{{closure}}",
            "core::future::future::Future::poll",
            "tokio::runtime::park::CachedParkThread::block_on",
            "shop::tests::checkout",
            "shop::tests::checkout::{{closure}}",
            "core::ops::function::FnOnce::call_once",
            "test::__rust_begin_short_backtrace",
        ])
        .infer_current_test()
        .unwrap();
        assert_eq!(identity.test_name, "checkout");
        assert_eq!(identity.job_name, "shop");
    }

    #[test]
    fn test_falls_back_to_entry_crate() {
        let identity = inspector(&[
            "webdriver_agent::executor::CommandExecutor::execute",
            "smoke::flows::login_flow",
            "smoke::main",
            "core::ops::function::FnOnce::call_once",
            "std::rt::lang_start::{{closure}}",
            "main",
        ])
        .infer_current_test()
        .unwrap();
        assert_eq!(identity.test_name, "login_flow");
        assert_eq!(identity.job_name, "flows");
        assert_eq!(identity.project_name, "smoke");
    }

    #[test]
    fn test_no_usable_frame() {
        assert_eq!(inspector(&[]).infer_current_test(), None);
        assert_eq!(
            inspector(&["core::ops::function::FnOnce::call_once", "main"]).infer_current_test(),
            None
        );
    }

    #[test]
    fn test_framework_restriction() {
        let inspector = inspector(LIBTEST_STACK).frameworks([TestFramework::Cucumber]);
        // Falls back to the innermost frame of the crate owning the stack.
        let identity = inspector.infer_current_test().unwrap();
        assert_eq!(identity.test_name, "submit");
        assert_eq!(identity.job_name, "LoginPage");
    }

    #[test]
    fn test_retry_helper_detection() {
        let inside = inspector(&[
            "webdriver_agent::executor::CommandExecutor::execute",
            "shop::tests::login::{{closure}}",
            "webdriver_agent::wait::Wait::until<shop::Driver, bool>",
            "shop::tests::login",
        ]);
        assert!(inside.is_inside_retry_helper());
        assert!(!inspector(LIBTEST_STACK).is_inside_retry_helper());

        let custom = inspector(&["shop::support::retry::eventually", "shop::tests::login"])
            .retry_marker("shop::support::retry::");
        assert!(custom.is_inside_retry_helper());
    }

    #[test]
    fn test_bdd_runner_detection() {
        let bdd = inspector(&[
            "features::steps::user_logs_in",
            "cucumber::runner::basic::Executor::run_step",
        ]);
        assert!(bdd.is_inside_bdd_runner());
        assert!(!inspector(LIBTEST_STACK).is_inside_bdd_runner());
    }

    #[test]
    fn test_live_backtrace_finds_this_test() {
        let identity = CallStackInspector::new().infer_current_test();
        assert_eq!(
            identity.map(|i| i.test_name),
            Some("test_live_backtrace_finds_this_test".to_string())
        );
    }
}
