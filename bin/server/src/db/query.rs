//! Query executor backing the database tools.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row};
use wicara_tools::{QueryError, QueryExecutor, QueryOutcome};

/// [`QueryExecutor`] over the server's Postgres pool.
pub struct SqlxQueryExecutor {
    pool: PgPool,
}

impl SqlxQueryExecutor {
    /// Creates an executor over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(err: sqlx::Error) -> QueryError {
    QueryError {
        reason: err.to_string(),
    }
}

/// Converts one row into a JSON object, column by column.
///
/// Postgres types outside the common set decode as null rather than failing
/// the whole query.
fn row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut object = Map::new();
    for column in row.columns() {
        let name = column.name();
        let value = if let Ok(v) = row.try_get::<Option<String>, _>(name) {
            v.map_or(Value::Null, Value::String)
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
            v.map_or(Value::Null, |n| json!(n))
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
            v.map_or(Value::Null, |n| json!(n))
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
            v.map_or(Value::Null, |n| json!(n))
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
            v.map_or(Value::Null, Value::Bool)
        } else if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(name) {
            v.map_or(Value::Null, |t| json!(t.to_rfc3339()))
        } else if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(name) {
            v.unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        object.insert(name.to_string(), value);
    }
    object
}

#[async_trait]
impl QueryExecutor for SqlxQueryExecutor {
    async fn execute(&self, sql: &str, params: &[String]) -> Result<QueryOutcome, QueryError> {
        let is_select = sql.trim_start().to_ascii_uppercase().starts_with("SELECT");
        if is_select {
            let mut query = sqlx::query(sql);
            for param in params {
                query = query.bind(param);
            }
            let rows = query.fetch_all(&self.pool).await.map_err(db_error)?;
            Ok(QueryOutcome::Rows(rows.iter().map(row_to_json).collect()))
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = query.bind(param);
            }
            let result = query.execute(&self.pool).await.map_err(db_error)?;
            Ok(QueryOutcome::Affected(result.rows_affected()))
        }
    }
}
