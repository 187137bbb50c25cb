//! Built-in database tools.
//!
//! All four tools run through a [`QueryExecutor`] with positional `$n`
//! parameters. Argument validation happens before the executor is touched,
//! so malformed invocations never reach the database.

use crate::error::ToolError;
use crate::query::{QueryExecutor, QueryOutcome};
use crate::registry::{result_payload, ToolHandler};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wicara_ai::FunctionDeclaration;

/// Read-only SQL over the staff table (`db_gukar_tool`).
pub struct StaffLookupTool {
    executor: Arc<dyn QueryExecutor>,
}

impl StaffLookupTool {
    /// Creates the tool over the given executor.
    #[must_use]
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for StaffLookupTool {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "db_gukar_tool".to_string(),
            description: "Menjalankan query SELECT pada tabel gukar (guru dan karyawan). \
                          Hanya pernyataan SELECT yang diizinkan."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sqlQuery": {
                        "type": "string",
                        "description": "Pernyataan SELECT yang akan dijalankan"
                    }
                },
                "required": ["sqlQuery"]
            }),
        }
    }

    async fn handle(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
        let sql = require_str(args, "sqlQuery")?;
        if !sql.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            return Err(ToolError::ReadOnlyRequired);
        }
        let outcome = self
            .executor
            .execute(sql, &[])
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                reason: e.to_string(),
            })?;
        Ok(result_payload(outcome_to_value(outcome)))
    }
}

/// Structured student lookup (`db_siswa_tool`).
pub struct StudentLookupTool {
    executor: Arc<dyn QueryExecutor>,
}

impl StudentLookupTool {
    /// Creates the tool over the given executor.
    #[must_use]
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for StudentLookupTool {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "db_siswa_tool".to_string(),
            description: "Mencari data siswa. search_term mencocokkan nama (sebagian) atau \
                          nisn/nipd (persis). rombel_saat_ini memfilter per rombel. \
                          aggregate=count mengembalikan jumlah baris."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "search_term": {
                        "type": "string",
                        "description": "Nama (sebagian) atau nisn/nipd (persis)"
                    },
                    "rombel_saat_ini": {
                        "type": "string",
                        "description": "Filter rombel, misalnya 'X-1'"
                    },
                    "aggregate": {
                        "type": "string",
                        "description": "Gunakan 'count' untuk menghitung baris"
                    }
                }
            }),
        }
    }

    async fn handle(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
        let search_term = optional_str(args, "search_term");
        let rombel = optional_str(args, "rombel_saat_ini");
        let aggregate = optional_str(args, "aggregate");
        if search_term.is_none() && rombel.is_none() && aggregate.is_none() {
            return Err(ToolError::InvalidArguments {
                reason: "at least one of search_term, rombel_saat_ini, aggregate is required"
                    .to_string(),
            });
        }

        let mut conditions = Vec::new();
        let mut params = Vec::new();
        if let Some(term) = search_term {
            params.push(format!("%{term}%"));
            let like_idx = params.len();
            params.push(term.to_string());
            let exact_idx = params.len();
            conditions.push(format!(
                "(nama LIKE ${like_idx} OR nisn = ${exact_idx} OR nipd = ${exact_idx})"
            ));
        }
        if let Some(rombel) = rombel {
            params.push(rombel.to_string());
            conditions.push(format!("rombel_saat_ini = ${}", params.len()));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sql = if aggregate == Some("count") {
            format!("SELECT COUNT(*) AS total FROM siswa{where_clause}")
        } else {
            format!("SELECT * FROM siswa{where_clause} ORDER BY nama LIMIT 20")
        };
        let outcome = self
            .executor
            .execute(&sql, &params)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                reason: e.to_string(),
            })?;
        Ok(result_payload(outcome_to_value(outcome)))
    }
}

/// Parameterized row update (`db_update_tool`).
pub struct TableUpdateTool {
    executor: Arc<dyn QueryExecutor>,
}

impl TableUpdateTool {
    /// Creates the tool over the given executor.
    #[must_use]
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for TableUpdateTool {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "db_update_tool".to_string(),
            description: "Memperbarui baris pada sebuah tabel. column_names dan column_values \
                          harus sama panjang; key memilih baris yang diubah."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_name": {"type": "string"},
                    "column_names": {"type": "array", "items": {"type": "string"}},
                    "column_values": {"type": "array", "items": {"type": "string"}},
                    "key": {
                        "type": "object",
                        "description": "Pasangan kolom dan nilai untuk klausa WHERE"
                    }
                },
                "required": ["table_name", "column_names", "column_values", "key"]
            }),
        }
    }

    async fn handle(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
        let table = require_identifier(args, "table_name")?;
        let (columns, values) = require_column_lists(args)?;
        let key = args
            .get("key")
            .and_then(Value::as_object)
            .ok_or_else(|| ToolError::InvalidArguments {
                reason: "key must be an object of column/value pairs".to_string(),
            })?;
        if key.is_empty() {
            return Err(ToolError::InvalidArguments {
                reason: "key must name at least one column".to_string(),
            });
        }

        let mut params: Vec<String> = values;
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ${}", i + 1))
            .collect();
        let mut predicates = Vec::new();
        for (column, value) in key {
            check_identifier(column)?;
            params.push(value_to_param(value));
            predicates.push(format!("{column} = ${}", params.len()));
        }
        let sql = format!(
            "UPDATE {table} SET {} WHERE {}",
            assignments.join(", "),
            predicates.join(" AND ")
        );
        let outcome = self
            .executor
            .execute(&sql, &params)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                reason: e.to_string(),
            })?;
        Ok(result_payload(outcome_to_value(outcome)))
    }
}

/// Parameterized row insert (`db_insert_tool`).
pub struct TableInsertTool {
    executor: Arc<dyn QueryExecutor>,
}

impl TableInsertTool {
    /// Creates the tool over the given executor.
    #[must_use]
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolHandler for TableInsertTool {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "db_insert_tool".to_string(),
            description: "Menyisipkan satu baris baru pada sebuah tabel. column_names dan \
                          column_values harus sama panjang."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_name": {"type": "string"},
                    "column_names": {"type": "array", "items": {"type": "string"}},
                    "column_values": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["table_name", "column_names", "column_values"]
            }),
        }
    }

    async fn handle(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
        let table = require_identifier(args, "table_name")?;
        let (columns, values) = require_column_lists(args)?;
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let outcome = self
            .executor
            .execute(&sql, &values)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                reason: e.to_string(),
            })?;
        Ok(result_payload(outcome_to_value(outcome)))
    }
}

fn require_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments {
            reason: format!("{name} must be a string"),
        })
}

fn optional_str<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn check_identifier(name: &str) -> Result<(), ToolError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments {
            reason: format!("invalid identifier: {name}"),
        })
    }
}

fn require_identifier<'a>(
    args: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a str, ToolError> {
    let value = require_str(args, name)?;
    check_identifier(value)?;
    Ok(value)
}

fn require_column_lists(
    args: &Map<String, Value>,
) -> Result<(Vec<String>, Vec<String>), ToolError> {
    let names = args
        .get("column_names")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::InvalidArguments {
            reason: "column_names must be an array".to_string(),
        })?;
    let values = args
        .get("column_values")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::InvalidArguments {
            reason: "column_values must be an array".to_string(),
        })?;
    if names.len() != values.len() {
        return Err(ToolError::InvalidArguments {
            reason: format!(
                "column_names has {} entries but column_values has {}",
                names.len(),
                values.len()
            ),
        });
    }
    if names.is_empty() {
        return Err(ToolError::InvalidArguments {
            reason: "column_names must not be empty".to_string(),
        });
    }
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_str().ok_or_else(|| ToolError::InvalidArguments {
            reason: "column_names entries must be strings".to_string(),
        })?;
        check_identifier(name)?;
        columns.push(name.to_string());
    }
    Ok((columns, values.iter().map(value_to_param).collect()))
}

fn value_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn outcome_to_value(outcome: QueryOutcome) -> Value {
    match outcome {
        QueryOutcome::Rows(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
        QueryOutcome::Affected(count) => json!(format!("{count} rows affected")),
    }
}
