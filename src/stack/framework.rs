use super::frame::FrameDescriptor;

/// Test frameworks whose entry points can be recognized on the stack
///
/// Evaluated in the order of [`TestFramework::ALL`]; the first framework
/// claiming a frame wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFramework {
    /// The built-in `test` harness (`#[test]`, `#[tokio::test]`, rstest, ...)
    LibTest,
    /// Custom harnesses built on `libtest-mimic`
    LibtestMimic,
    /// `cucumber` step functions
    Cucumber,
}

impl TestFramework {
    /// All supported frameworks, in priority order
    pub const ALL: [TestFramework; 3] = [
        TestFramework::LibTest,
        TestFramework::LibtestMimic,
        TestFramework::Cucumber,
    ];

    /// Crate whose frames call directly into test code
    pub(crate) fn runner_crate(&self) -> &'static str {
        match self {
            TestFramework::LibTest => "test",
            TestFramework::LibtestMimic => "libtest_mimic",
            TestFramework::Cucumber => "cucumber",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TestFramework::LibTest => "libtest",
            TestFramework::LibtestMimic => "libtest-mimic",
            TestFramework::Cucumber => "cucumber",
        }
    }

    /// Whether `frame` is a test function invoked by this framework
    ///
    /// `caller` is the nearest outer frame that is neither part of the same
    /// function nor runtime plumbing.
    pub fn is_test_entry_point(
        &self,
        frame: &FrameDescriptor,
        caller: Option<&FrameDescriptor>,
    ) -> bool {
        if frame.is_runtime() || frame.in_crate(self.runner_crate()) {
            return false;
        }
        caller.is_some_and(|c| c.in_crate(self.runner_crate()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libtest_entry_point() {
        let frame = FrameDescriptor::parse("shop::tests::login");
        let runner = FrameDescriptor::parse("test::__rust_begin_short_backtrace");
        let helper = FrameDescriptor::parse("shop::pages::LoginPage::submit");

        assert!(TestFramework::LibTest.is_test_entry_point(&frame, Some(&runner)));
        assert!(!TestFramework::LibTest.is_test_entry_point(&frame, Some(&helper)));
        assert!(!TestFramework::LibTest.is_test_entry_point(&frame, None));
        assert!(!TestFramework::Cucumber.is_test_entry_point(&frame, Some(&runner)));
    }

    #[test]
    fn test_runner_frames_are_never_entry_points() {
        let runner = FrameDescriptor::parse("test::run_test");
        let outer = FrameDescriptor::parse("test::run_test_in_process");
        assert!(!TestFramework::LibTest.is_test_entry_point(&runner, Some(&outer)));
    }

    #[test]
    fn test_cucumber_step() {
        let step = FrameDescriptor::parse("features::steps::user_logs_in");
        let runner = FrameDescriptor::parse("cucumber::step::Collection::find");
        assert!(TestFramework::Cucumber.is_test_entry_point(&step, Some(&runner)));
    }
}
