pub mod client;
pub mod http;
pub mod types;

pub use client::{AgentClient, AgentOptions, MIN_BATCH_AGENT_VERSION, supports_batching};
pub use http::AgentHttp;
pub use types::{
    AgentError, AgentResult, ReportSettings, ReportType, SDK_VERSION, SessionRequest,
    SessionResponse, UNNAMED_JOB, UNNAMED_PROJECT,
};
