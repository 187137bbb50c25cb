//! Backend-agnostic generation types and boundary traits.

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wicara_conversation::Content;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Softmax temperature.
    pub temperature: f32,
    /// Hard cap on generated tokens.
    pub max_output_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_output_tokens: 6000,
        }
    }
}

/// Declaration of one callable function, advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Name the model uses to invoke the function.
    pub name: String,
    /// Natural-language description guiding when to call it.
    pub description: String,
    /// JSON schema of the accepted arguments.
    pub parameters: Value,
}

/// A group of function declarations sent as one tool entry.
///
/// Groups mirror how declarations are registered: related functions travel
/// together so the backend receives the same grouping the registry holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolGroup {
    /// Declarations in this group.
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Everything a backend needs for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Conversation so far, oldest first, ending with the newest input.
    pub contents: Vec<Content>,
    /// Standing instruction prepended out-of-band.
    pub system_instruction: String,
    /// Tools the model may call.
    pub tools: Vec<ToolGroup>,
    /// Sampling parameters.
    pub sampling: SamplingConfig,
}

/// Text generation boundary.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Runs one generation call and returns the model's content bundle.
    async fn generate(&self, request: &GenerationRequest) -> Result<Content, GenerationError>;
}

/// Upload boundary for binary media the model should read by reference.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Uploads the bytes and returns a URI usable in a file-data part.
    ///
    /// Implementations must not return before the uploaded file is ready for
    /// model consumption.
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<String, GenerationError>;
}
