//! Database-backed implementations of the engine boundaries.

pub mod conversation;
pub mod query;

pub use conversation::ConversationRepository;
pub use query::SqlxQueryExecutor;
