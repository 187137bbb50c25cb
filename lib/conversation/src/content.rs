//! Role-tagged content bundles exchanged with the generation boundary.
//!
//! A [`Content`] is one logical message: a role plus an ordered list of
//! [`Part`]s. Parts form a closed union tagged by `type` when serialized, so
//! persisted history and live traffic share one shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Originator of a content bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user on the messaging channel.
    User,
    /// The generation model.
    Model,
    /// Synthetic role carrying tool execution results back to the model.
    Tool,
    /// A human operator replying on the bot's behalf.
    Admin,
}

/// One atomic piece of a message.
///
/// Serialized with an internal `type` tag so mixed-part histories stay
/// self-describing:
///
/// ```json
/// {"type": "text", "text": "halo"}
/// {"type": "tool_call", "name": "db_siswa_tool", "args": {"search_term": "budi"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Plain text.
    Text {
        /// The text payload.
        text: String,
    },
    /// Reference to an uploaded file the model can read.
    FileData {
        /// URI returned by the file store at upload time.
        file_uri: String,
        /// MIME type of the referenced file.
        mime_type: String,
    },
    /// A function invocation requested by the model.
    ToolCall {
        /// Declared tool name.
        name: String,
        /// Arguments as a JSON object.
        args: Map<String, Value>,
    },
    /// The outcome of executing a requested function.
    ToolResult {
        /// Name of the tool that produced this result.
        name: String,
        /// Result payload as a JSON object.
        response: Map<String, Value>,
    },
}

impl Part {
    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a file reference part.
    #[must_use]
    pub fn file_data(file_uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::FileData {
            file_uri: file_uri.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Creates a tool invocation part.
    #[must_use]
    pub fn tool_call(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self::ToolCall {
            name: name.into(),
            args,
        }
    }

    /// Creates a tool result part.
    #[must_use]
    pub fn tool_result(name: impl Into<String>, response: Map<String, Value>) -> Self {
        Self::ToolResult {
            name: name.into(),
            response,
        }
    }

    /// Returns `true` for [`Part::ToolCall`].
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall { .. })
    }
}

/// A role-tagged bundle of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced this bundle.
    pub role: Role,
    /// Ordered message parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// Creates a content bundle with an explicit role.
    #[must_use]
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Creates a user-role bundle.
    #[must_use]
    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    /// Creates a model-role bundle.
    #[must_use]
    pub fn model(parts: Vec<Part>) -> Self {
        Self::new(Role::Model, parts)
    }

    /// Creates a tool-role bundle carrying execution results.
    #[must_use]
    pub fn tool(parts: Vec<Part>) -> Self {
        Self::new(Role::Tool, parts)
    }

    /// Creates an admin-role bundle holding a single text part.
    #[must_use]
    pub fn admin_text(text: impl Into<String>) -> Self {
        Self::new(Role::Admin, vec![Part::text(text)])
    }

    /// Joins all text parts with newlines, preserving order.
    ///
    /// Returns an empty string when no text parts are present.
    #[must_use]
    pub fn text_joined(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the tool calls in this bundle, in emission order.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<(&str, &Map<String, Value>)> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::ToolCall { name, args } => Some((name.as_str(), args)),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` when any part is a tool call.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.parts.iter().any(Part::is_tool_call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn text_part_wire_shape() {
        let part = Part::text("halo");
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "halo"}));
    }

    #[test]
    fn file_data_part_wire_shape() {
        let part = Part::file_data("files/abc", "image/jpeg");
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(
            value,
            json!({"type": "file_data", "file_uri": "files/abc", "mime_type": "image/jpeg"})
        );
    }

    #[test]
    fn tool_call_roundtrip() {
        let mut args = Map::new();
        args.insert("search_term".to_string(), json!("budi"));
        let part = Part::tool_call("db_siswa_tool", args);
        let json = serde_json::to_string(&part).unwrap();
        let parsed: Part = serde_json::from_str(&json).unwrap();
        assert_eq!(part, parsed);
    }

    #[test]
    fn tool_result_roundtrip() {
        let mut response = Map::new();
        response.insert("result".to_string(), json!("Error: boom"));
        let part = Part::tool_result("cctv_tool", response);
        let json = serde_json::to_string(&part).unwrap();
        let parsed: Part = serde_json::from_str(&json).unwrap();
        assert_eq!(part, parsed);
    }

    #[test]
    fn mixed_content_roundtrip() {
        let mut args = Map::new();
        args.insert("command".to_string(), json!("restart"));
        let content = Content::model(vec![
            Part::text("sebentar ya"),
            Part::tool_call("cctv_tool", args),
        ]);
        let json = serde_json::to_string(&content).unwrap();
        let parsed: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(content, parsed);
        assert!(parsed.has_tool_calls());
    }

    #[test]
    fn text_joined_skips_non_text_parts() {
        let content = Content::model(vec![
            Part::text("satu"),
            Part::file_data("files/x", "image/png"),
            Part::text("dua"),
        ]);
        assert_eq!(content.text_joined(), "satu\ndua");
    }

    #[test]
    fn text_joined_empty_when_no_text() {
        let content = Content::tool(vec![Part::tool_result("ss_tool", Map::new())]);
        assert_eq!(content.text_joined(), "");
    }

    #[test]
    fn tool_calls_preserve_emission_order() {
        let content = Content::model(vec![
            Part::tool_call("db_gukar_tool", Map::new()),
            Part::text("antara"),
            Part::tool_call("ss_tool", Map::new()),
        ]);
        let names: Vec<&str> = content.tool_calls().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["db_gukar_tool", "ss_tool"]);
    }
}
