//! Generation boundary and the Gemini client.
//!
//! The engine depends only on the [`GenerationBackend`] and [`FileStore`]
//! traits defined here; [`gemini`] provides the production implementation
//! over the Gemini HTTP API.

pub mod error;
pub mod gemini;
pub mod generate;

pub use error::GenerationError;
pub use gemini::GeminiClient;
pub use generate::{
    FileStore, FunctionDeclaration, GenerationBackend, GenerationRequest, SamplingConfig,
    ToolGroup,
};
