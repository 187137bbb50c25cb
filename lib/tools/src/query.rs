//! Database access boundary for the built-in database tools.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// Result of executing one SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows returned by a `SELECT`, one JSON object per row.
    Rows(Vec<Map<String, Value>>),
    /// Number of rows touched by a write statement.
    Affected(u64),
}

/// Error returned by a [`QueryExecutor`].
#[derive(Debug)]
pub struct QueryError {
    /// Description of the database failure.
    pub reason: String,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed: {}", self.reason)
    }
}

impl std::error::Error for QueryError {}

/// Executes parameterized SQL on behalf of the database tools.
///
/// Parameters bind positionally to `$1..$n` placeholders in the statement.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs the statement with the given positional parameters.
    async fn execute(&self, sql: &str, params: &[String]) -> Result<QueryOutcome, QueryError>;
}
