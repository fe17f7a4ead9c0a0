pub mod redact;
pub mod translate;
pub mod types;

pub use redact::{CommandRedactor, Platform, REDACTED};
pub use translate::normalize;
pub use types::{Command, Parameters, Response, Status, names};
