pub mod pipeline;
pub mod queue;
pub mod reporter;
pub mod types;

pub use pipeline::{ReportSink, ReportingFlags, ReportingPipeline};
pub use queue::{DeliveryMode, ReportQueue, ReportUploader};
pub use reporter::Reporter;
pub use types::{CommandReport, ReportItem, StepReport, TestReport, UploadError, endpoints};
