//! Tool declarations, grouping, and dispatch.

use crate::error::ToolError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use wicara_ai::{FunctionDeclaration, ToolGroup};
use wicara_conversation::Part;

/// Reply sent to the model when it invokes a name the registry does not know.
const UNRECOGNIZED_TOOL: &str = "Tool tidak dikenal.";

/// One callable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The declaration advertised to the model.
    fn declaration(&self) -> FunctionDeclaration;

    /// Executes the tool with the model-supplied arguments.
    async fn handle(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError>;
}

/// Named set of handlers registered and dispatched together.
pub struct ToolRegistry {
    groups: Vec<Vec<Arc<dyn ToolHandler>>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Adds a group of handlers advertised as one tool entry.
    #[must_use]
    pub fn with_group(mut self, handlers: Vec<Arc<dyn ToolHandler>>) -> Self {
        self.groups.push(handlers);
        self
    }

    /// Returns the declarations for every group, in registration order.
    #[must_use]
    pub fn tool_groups(&self) -> Vec<ToolGroup> {
        self.groups
            .iter()
            .map(|handlers| ToolGroup {
                function_declarations: handlers.iter().map(|h| h.declaration()).collect(),
            })
            .collect()
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.groups
            .iter()
            .flatten()
            .find(|handler| handler.declaration().name == name)
    }

    /// Dispatches one invocation and returns the tool-result part.
    ///
    /// Never fails: unknown names and handler errors are reported to the
    /// model inside the result payload.
    pub async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> Part {
        let Some(handler) = self.find(name) else {
            tracing::warn!(tool = name, "model invoked unrecognized tool");
            return Part::tool_result(name, result_payload(UNRECOGNIZED_TOOL.into()));
        };
        match handler.handle(args).await {
            Ok(response) => Part::tool_result(name, response),
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "tool execution failed");
                Part::tool_result(name, result_payload(format!("Error: {err}").into()))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a value in the `{"result": ...}` payload shape handlers use.
#[must_use]
pub fn result_payload(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("result".to_string(), value);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration {
                name: "echo".to_string(),
                description: "Echoes its input".to_string(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn handle(
            &self,
            args: &Map<String, Value>,
        ) -> Result<Map<String, Value>, ToolError> {
            Ok(args.clone())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration {
                name: "fail".to_string(),
                description: "Always fails".to_string(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn handle(
            &self,
            _args: &Map<String, Value>,
        ) -> Result<Map<String, Value>, ToolError> {
            Err(ToolError::ExecutionFailed {
                reason: "boom".to_string(),
            })
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_group(vec![Arc::new(EchoTool)])
            .with_group(vec![Arc::new(FailingTool)])
    }

    #[tokio::test]
    async fn dispatch_returns_handler_response() {
        let mut args = Map::new();
        args.insert("k".to_string(), json!("v"));
        let part = registry().dispatch("echo", &args).await;
        match part {
            Part::ToolResult { name, response } => {
                assert_eq!(name, "echo");
                assert_eq!(response.get("k"), Some(&json!("v")));
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_name_yields_unrecognized_payload() {
        let part = registry().dispatch("nope", &Map::new()).await;
        match part {
            Part::ToolResult { name, response } => {
                assert_eq!(name, "nope");
                assert_eq!(response.get("result"), Some(&json!("Tool tidak dikenal.")));
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_error_becomes_error_payload() {
        let part = registry().dispatch("fail", &Map::new()).await;
        match part {
            Part::ToolResult { response, .. } => {
                let result = response.get("result").and_then(Value::as_str).unwrap();
                assert!(result.starts_with("Error: "));
                assert!(result.contains("boom"));
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[test]
    fn tool_groups_preserve_registration_order() {
        let groups = registry().tool_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].function_declarations[0].name, "echo");
        assert_eq!(groups[1].function_declarations[0].name, "fail");
    }
}
