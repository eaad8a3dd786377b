pub mod error;
pub mod registry;
pub mod tools;

pub use error::{DispatchError, DispatchErrorKind};
pub use registry::{ToolDispatcher, ToolHandler};
pub use tools::{FILE_SUMMARY_TOOL, FileSummaryTool, SummaryBackend};
