//! The iterative generate/dispatch loop.

use crate::error::EngineError;
use crate::outbound::OutboundMessenger;
use std::sync::Arc;
use wicara_ai::{GenerationBackend, GenerationRequest, SamplingConfig};
use wicara_conversation::{Content, ConversationStore};
use wicara_core::{ActivationId, ChatId};
use wicara_tools::ToolRegistry;

/// Fallback sent to the user when an activation aborts.
const DEFAULT_APOLOGY: &str = "Maaf, terjadi kesalahan saat memproses permintaan Anda.";

/// Hard ceiling on tool rounds within one activation.
const DEFAULT_MAX_DEPTH: u32 = 8;

/// Tunables for the orchestration loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Standing instruction sent with every generation call.
    pub system_instruction: String,
    /// Sampling parameters.
    pub sampling: SamplingConfig,
    /// Maximum tool rounds before the activation is aborted.
    pub max_depth: u32,
    /// Message sent to the user when the activation fails.
    pub apology: String,
}

impl OrchestratorConfig {
    /// Creates a config with the given system instruction and defaults
    /// elsewhere.
    #[must_use]
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            sampling: SamplingConfig::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            apology: DEFAULT_APOLOGY.to_string(),
        }
    }

    /// Overrides the tool-round ceiling.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// How one activation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model produced a reply with no further tool calls.
    Terminated {
        /// Number of generation rounds consumed.
        rounds: u32,
    },
    /// The activation aborted; the user received the apology message.
    Failed,
}

/// Runs the generation loop for one inbound message.
pub struct Orchestrator {
    backend: Arc<dyn GenerationBackend>,
    registry: Arc<ToolRegistry>,
    store: Arc<dyn ConversationStore>,
    outbound: Arc<dyn OutboundMessenger>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Assembles an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn ConversationStore>,
        outbound: Arc<dyn OutboundMessenger>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            store,
            outbound,
            config,
        }
    }

    /// Runs the loop to completion for one inbound content bundle.
    ///
    /// Failures never escape: on any error the user receives the apology
    /// message and the outcome is [`LoopOutcome::Failed`].
    pub async fn respond(
        &self,
        chat_id: &ChatId,
        input: Content,
        history: Vec<Content>,
    ) -> LoopOutcome {
        let activation = ActivationId::new();
        match self.run(chat_id, input, history).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(chat = %chat_id, %activation, error = %err, "activation aborted");
                if let Err(send_err) = self
                    .outbound
                    .send_text(chat_id, &self.config.apology)
                    .await
                {
                    tracing::error!(chat = %chat_id, error = %send_err, "failed to send apology");
                }
                LoopOutcome::Failed
            }
        }
    }

    async fn run(
        &self,
        chat_id: &ChatId,
        input: Content,
        history: Vec<Content>,
    ) -> Result<LoopOutcome, EngineError> {
        let mut contents = history;
        contents.push(input.clone());
        let mut round_input = input;
        let mut depth: u32 = 0;
        let mut rounds: u32 = 0;

        loop {
            let request = GenerationRequest {
                contents: contents.clone(),
                system_instruction: self.config.system_instruction.clone(),
                tools: self.registry.tool_groups(),
                sampling: self.config.sampling,
            };
            let response = self.backend.generate(&request).await?;
            rounds += 1;
            tracing::debug!(chat = %chat_id, rounds, depth, "generation round complete");

            // Any text the model produced goes out immediately, even when
            // the same response also requests tool calls. Delivery failures
            // do not abort the activation.
            let text = response.text_joined();
            if !text.is_empty() {
                if let Err(err) = self.outbound.send_text(chat_id, &text).await {
                    tracing::warn!(chat = %chat_id, error = %err, "outbound send failed");
                }
            }

            self.store
                .append_turn(chat_id, Some(round_input.clone()), Some(response.clone()))
                .await?;

            if !response.has_tool_calls() {
                return Ok(LoopOutcome::Terminated { rounds });
            }

            depth += 1;
            if depth > self.config.max_depth {
                return Err(EngineError::DepthExceeded {
                    max: self.config.max_depth,
                });
            }

            let mut results = Vec::new();
            for (name, args) in response.tool_calls() {
                results.push(self.registry.dispatch(name, args).await);
            }
            let tool_content = Content::tool(results);

            contents.push(response);
            contents.push(tool_content.clone());
            round_input = tool_content;
        }
    }
}
