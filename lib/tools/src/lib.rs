//! Callable tools the model can invoke mid-conversation.
//!
//! Handlers implement [`ToolHandler`]; the [`ToolRegistry`] groups them,
//! advertises their declarations to the generation backend, and dispatches
//! invocations by name. Dispatch never fails: every outcome, including
//! unknown names and handler errors, becomes a tool-result part the model
//! can read.

pub mod db;
pub mod error;
pub mod query;
pub mod registry;
pub mod system;

pub use db::{StaffLookupTool, StudentLookupTool, TableInsertTool, TableUpdateTool};
pub use error::ToolError;
pub use query::{QueryError, QueryExecutor, QueryOutcome};
pub use registry::{ToolHandler, ToolRegistry};
pub use system::{CommandSnapshotSource, ServiceControlTool, SnapshotSource, SnapshotTool};
