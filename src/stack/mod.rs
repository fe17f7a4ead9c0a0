pub mod frame;
pub mod framework;
pub mod inspector;

pub use frame::FrameDescriptor;
pub use framework::TestFramework;
pub use inspector::{BacktraceSource, CallStackInspector, FrameSource, StackSnapshot, TestIdentity};
