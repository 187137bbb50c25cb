//! Gemini HTTP client implementing the generation and file-store boundaries.

use crate::error::GenerationError;
use crate::generate::{FileStore, GenerationBackend, GenerationRequest, ToolGroup};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use wicara_conversation::{Content, Part, Role};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
const UPLOAD_POLL_ATTEMPTS: u32 = 20;
const UPLOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Harm categories forced to `BLOCK_NONE` on every request.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Client for the Gemini `generateContent` and Files APIs.
pub struct GeminiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates a client for the given model.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn file_state(&self, name: &str) -> Result<WireFile, GenerationError> {
        let url = format!("{}/v1beta/{}?key={}", self.api_url, name, self.api_key);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GenerationError::UploadFailed {
                reason: format!("file status returned {}", response.status()),
            });
        }
        response
            .json::<WireFile>()
            .await
            .map_err(|e| GenerationError::ResponseParseFailed {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Content, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_url, self.model, self.api_key
        );
        let body = build_request_body(request);
        tracing::debug!(
            model = %self.model,
            contents = request.contents.len(),
            "sending generation request"
        );
        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerationError::RequestFailed {
                reason: format!("status {status}: {detail}"),
            });
        }
        let wire: WireResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        let candidate =
            wire.candidates
                .into_iter()
                .next()
                .ok_or(GenerationError::ResponseParseFailed {
                    reason: "response contained no candidates".to_string(),
                })?;
        wire_to_content(candidate.content)
    }
}

#[async_trait]
impl FileStore for GeminiClient {
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/upload/v1beta/files?key={}",
            self.api_url, self.api_key
        );
        let response = self
            .http
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes.to_vec())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GenerationError::UploadFailed {
                reason: format!("upload returned {}", response.status()),
            });
        }
        let wrapper: WireFileWrapper =
            response
                .json()
                .await
                .map_err(|e| GenerationError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        let mut file = wrapper.file;

        // Uploaded files start in PROCESSING; only ACTIVE files may be
        // referenced from a generation request.
        let mut attempts = 0;
        while file.state == "PROCESSING" {
            attempts += 1;
            if attempts > UPLOAD_POLL_ATTEMPTS {
                return Err(GenerationError::UploadFailed {
                    reason: format!("file {} never became active", file.name),
                });
            }
            tokio::time::sleep(UPLOAD_POLL_INTERVAL).await;
            file = self.file_state(&file.name).await?;
        }
        if file.state != "ACTIVE" {
            return Err(GenerationError::UploadFailed {
                reason: format!("file {} entered state {}", file.name, file.state),
            });
        }
        Ok(file.uri)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    system_instruction: WireSystemInstruction,
    tools: Vec<WireTool>,
    generation_config: WireGenerationConfig,
    safety_settings: Vec<WireSafetySetting>,
}

#[derive(Debug, Serialize)]
struct WireSystemInstruction {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    role: String,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WirePart {
    #[serde(rename = "text")]
    Text(String),
    FileData {
        #[serde(rename = "fileUri")]
        file_uri: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    FunctionCall {
        name: String,
        args: Map<String, Value>,
    },
    FunctionResponse {
        name: String,
        response: Map<String, Value>,
    },
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: WireContent,
}

#[derive(Debug, Deserialize)]
struct WireFileWrapper {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    name: String,
    uri: String,
    state: String,
}

fn build_request_body(request: &GenerationRequest) -> WireRequest {
    WireRequest {
        contents: request.contents.iter().map(content_to_wire).collect(),
        system_instruction: WireSystemInstruction {
            parts: vec![WirePart::Text(request.system_instruction.clone())],
        },
        tools: request.tools.iter().map(tool_group_to_wire).collect(),
        generation_config: WireGenerationConfig {
            temperature: request.sampling.temperature,
            max_output_tokens: request.sampling.max_output_tokens,
        },
        safety_settings: SAFETY_CATEGORIES
            .iter()
            .map(|category| WireSafetySetting {
                category,
                threshold: "BLOCK_NONE",
            })
            .collect(),
    }
}

fn tool_group_to_wire(group: &ToolGroup) -> WireTool {
    WireTool {
        function_declarations: group
            .function_declarations
            .iter()
            .map(|decl| {
                serde_json::json!({
                    "name": decl.name,
                    "description": decl.description,
                    "parameters": decl.parameters,
                })
            })
            .collect(),
    }
}

fn content_to_wire(content: &Content) -> WireContent {
    let role = match content.role {
        Role::User | Role::Admin => "user",
        Role::Model => "model",
        Role::Tool => "tool",
    };
    WireContent {
        role: role.to_string(),
        parts: content.parts.iter().map(part_to_wire).collect(),
    }
}

fn part_to_wire(part: &Part) -> WirePart {
    match part {
        Part::Text { text } => WirePart::Text(text.clone()),
        Part::FileData {
            file_uri,
            mime_type,
        } => WirePart::FileData {
            file_uri: file_uri.clone(),
            mime_type: mime_type.clone(),
        },
        Part::ToolCall { name, args } => WirePart::FunctionCall {
            name: name.clone(),
            args: args.clone(),
        },
        Part::ToolResult { name, response } => WirePart::FunctionResponse {
            name: name.clone(),
            response: response.clone(),
        },
    }
}

fn wire_to_content(wire: WireContent) -> Result<Content, GenerationError> {
    let role = match wire.role.as_str() {
        "user" => Role::User,
        "model" => Role::Model,
        "tool" => Role::Tool,
        other => {
            return Err(GenerationError::ResponseParseFailed {
                reason: format!("unknown role in response: {other}"),
            });
        }
    };
    let parts = wire
        .parts
        .into_iter()
        .map(|part| match part {
            WirePart::Text(text) => Part::Text { text },
            WirePart::FileData {
                file_uri,
                mime_type,
            } => Part::FileData {
                file_uri,
                mime_type,
            },
            WirePart::FunctionCall { name, args } => Part::ToolCall { name, args },
            WirePart::FunctionResponse { name, response } => Part::ToolResult { name, response },
        })
        .collect();
    Ok(Content { role, parts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{FunctionDeclaration, SamplingConfig};
    use serde_json::json;

    fn sample_request() -> GenerationRequest {
        GenerationRequest {
            contents: vec![Content::user(vec![Part::text("halo")])],
            system_instruction: "Jawab singkat.".to_string(),
            tools: vec![ToolGroup {
                function_declarations: vec![FunctionDeclaration {
                    name: "db_gukar_tool".to_string(),
                    description: "Run read-only queries".to_string(),
                    parameters: json!({"type": "object"}),
                }],
            }],
            sampling: SamplingConfig::default(),
        }
    }

    #[test]
    fn request_body_carries_all_sections() {
        let body = serde_json::to_value(build_request_body(&sample_request())).unwrap();
        assert_eq!(body["contents"][0]["role"], json!("user"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], json!("halo"));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("Jawab singkat.")
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            json!("db_gukar_tool")
        );
        assert_eq!(body["generationConfig"]["temperature"], json!(1.0));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(6000));
    }

    #[test]
    fn all_safety_categories_disabled() {
        let body = serde_json::to_value(build_request_body(&sample_request())).unwrap();
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        for setting in settings {
            assert_eq!(setting["threshold"], json!("BLOCK_NONE"));
        }
    }

    #[test]
    fn tool_call_part_maps_to_function_call() {
        let mut args = Map::new();
        args.insert("command".to_string(), json!("restart"));
        let wire = part_to_wire(&Part::tool_call("cctv_tool", args));
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["functionCall"]["name"], json!("cctv_tool"));
        assert_eq!(value["functionCall"]["args"]["command"], json!("restart"));
    }

    #[test]
    fn tool_role_maps_to_wire_tool_role() {
        let content = Content::tool(vec![Part::tool_result("ss_tool", Map::new())]);
        let wire = content_to_wire(&content);
        assert_eq!(wire.role, "tool");
    }

    #[test]
    fn response_content_parses_back_into_parts() {
        let wire: WireContent = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "hasilnya:"},
                {"functionCall": {"name": "db_siswa_tool", "args": {"search_term": "budi"}}}
            ]
        }))
        .unwrap();
        let content = wire_to_content(wire).unwrap();
        assert_eq!(content.role, Role::Model);
        assert_eq!(content.parts.len(), 2);
        assert!(content.has_tool_calls());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let wire = WireContent {
            role: "system".to_string(),
            parts: vec![],
        };
        assert!(wire_to_content(wire).is_err());
    }
}
