//! Channel-level dispatch in front of the orchestration loop.

use crate::error::EngineError;
use crate::observer::{ObserverEvent, ObserverHub, TurnSnapshot};
use crate::orchestrator::Orchestrator;
use crate::outbound::{MediaResolver, OutboundMessenger};
use std::sync::Arc;
use wicara_conversation::{Content, ControlState, ConversationStore, Part};
use wicara_core::ChatId;

/// Confirmation sent after a successful history wipe.
const CLEAR_CONFIRMATION: &str = "Riwayat percakapan Anda telah berhasil dihapus.";

/// Caption substituted when media arrives without one.
const MEDIA_FALLBACK_CAPTION: &str = "perhatikan ini.";

/// A media attachment referenced by an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMedia {
    /// Provider-side media id, resolvable to bytes.
    pub id: String,
    /// Caption supplied by the sender, if any.
    pub caption: Option<String>,
}

/// One inbound user message, already parsed from the provider payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Sender, which is also the conversation key.
    pub from: ChatId,
    /// Text body, if any.
    pub text: Option<String>,
    /// Attached media, if any.
    pub media: Option<InboundMedia>,
}

/// Applies the channel rules for one inbound message, then hands the content
/// to the orchestrator when the bot holds control.
pub struct Dispatcher {
    store: Arc<dyn ConversationStore>,
    orchestrator: Arc<Orchestrator>,
    media: Arc<dyn MediaResolver>,
    outbound: Arc<dyn OutboundMessenger>,
    hub: ObserverHub,
    apology: String,
}

impl Dispatcher {
    /// Assembles a dispatcher from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        orchestrator: Arc<Orchestrator>,
        media: Arc<dyn MediaResolver>,
        outbound: Arc<dyn OutboundMessenger>,
        hub: ObserverHub,
        apology: impl Into<String>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            media,
            outbound,
            hub,
            apology: apology.into(),
        }
    }

    /// Processes one inbound message end to end.
    ///
    /// Failures never escape: on any error the user receives the apology
    /// message.
    pub async fn handle(&self, event: InboundEvent) {
        let chat_id = event.from.clone();
        if let Err(err) = self.process(event).await {
            tracing::error!(chat = %chat_id, error = %err, "inbound dispatch failed");
            if let Err(send_err) = self.outbound.send_text(&chat_id, &self.apology).await {
                tracing::error!(chat = %chat_id, error = %send_err, "failed to send apology");
            }
        }
    }

    /// Records an operator reply and delivers it to the user.
    pub async fn admin_reply(&self, chat_id: &ChatId, text: &str) -> Result<(), EngineError> {
        self.store.append_admin_reply(chat_id, text).await?;
        if let Err(err) = self.outbound.send_text(chat_id, text).await {
            tracing::warn!(chat = %chat_id, error = %err, "admin reply delivery failed");
        }
        self.hub.publish(ObserverEvent::NewMessage {
            chat_id: chat_id.clone(),
            message: TurnSnapshot {
                user: None,
                bot: Some(Content::admin_text(text)),
            },
        });
        Ok(())
    }

    async fn process(&self, event: InboundEvent) -> Result<(), EngineError> {
        let chat_id = event.from;

        // The clear command is honored before any control branching, so it
        // wipes history no matter who holds the conversation.
        if let Some(text) = &event.text {
            if text.trim().eq_ignore_ascii_case("clear") {
                self.store.clear(&chat_id).await?;
                if let Err(err) = self
                    .outbound
                    .send_text(&chat_id, CLEAR_CONFIRMATION)
                    .await
                {
                    tracing::warn!(chat = %chat_id, error = %err, "clear confirmation failed");
                }
                return Ok(());
            }
        }

        let input = self.assemble_input(&event.text, event.media.as_ref()).await;
        let Some(input) = input else {
            tracing::debug!(chat = %chat_id, "ignoring inbound message with no usable parts");
            return Ok(());
        };

        let is_new = !self.store.exists(&chat_id).await?;
        let control = self.store.get_control(&chat_id).await?;

        match control {
            ControlState::Admin => {
                self.store
                    .append_turn(&chat_id, Some(input.clone()), None)
                    .await?;
                self.hub.publish(ObserverEvent::NewMessage {
                    chat_id: chat_id.clone(),
                    message: TurnSnapshot {
                        user: Some(input),
                        bot: None,
                    },
                });
            }
            ControlState::Bot => {
                let history = self.store.load_history(&chat_id).await?;
                self.orchestrator.respond(&chat_id, input, history).await;
            }
        }

        if is_new {
            self.hub.publish(ObserverEvent::NewConversation {
                chat_id: chat_id.clone(),
            });
        }
        Ok(())
    }

    /// Builds the user content bundle, resolving media references.
    ///
    /// Returns `None` when the message carries neither text nor media, and
    /// when media resolution fails with no sender text to fall back on.
    /// The placeholder caption only ever accompanies resolved media.
    async fn assemble_input(
        &self,
        text: &Option<String>,
        media: Option<&InboundMedia>,
    ) -> Option<Content> {
        let text = text.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let mut parts = Vec::new();
        if let Some(media) = media {
            let caption = media
                .caption
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            match self.media.resolve(&media.id).await {
                Ok(resolved) => {
                    parts.push(Part::text(
                        caption.or(text).unwrap_or(MEDIA_FALLBACK_CAPTION),
                    ));
                    parts.push(Part::file_data(resolved.file_uri, resolved.mime_type));
                }
                Err(err) => {
                    tracing::warn!(media = %media.id, error = %err, "media resolution failed");
                    if let Some(caption) = caption {
                        parts.push(Part::text(caption));
                    }
                }
            }
        }
        if parts.is_empty() {
            if let Some(text) = text {
                parts.push(Part::text(text));
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(Content::user(parts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OrchestratorConfig;
    use crate::outbound::{MediaError, OutboundError, ResolvedMedia};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use wicara_ai::{GenerationBackend, GenerationError, GenerationRequest};
    use wicara_conversation::{MemoryConversationStore, Role};
    use wicara_tools::ToolRegistry;

    struct ScriptedBackend {
        replies: Mutex<VecDeque<Content>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Content>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Content, GenerationError> {
            self.replies.lock().unwrap().pop_front().ok_or(
                GenerationError::RequestFailed {
                    reason: "script exhausted".to_string(),
                },
            )
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    impl RecordingMessenger {
        fn sent(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OutboundMessenger for RecordingMessenger {
        async fn send_text(&self, to: &ChatId, text: &str) -> Result<(), OutboundError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.clone(), text.to_string()));
            Ok(())
        }
    }

    struct FixedResolver;

    #[async_trait]
    impl MediaResolver for FixedResolver {
        async fn resolve(&self, media_id: &str) -> Result<ResolvedMedia, MediaError> {
            Ok(ResolvedMedia {
                file_uri: format!("files/{media_id}"),
                mime_type: "image/jpeg".to_string(),
            })
        }
    }

    struct FailingResolver;

    #[async_trait]
    impl MediaResolver for FailingResolver {
        async fn resolve(&self, _media_id: &str) -> Result<ResolvedMedia, MediaError> {
            Err(MediaError {
                reason: "download failed".to_string(),
            })
        }
    }

    fn chat() -> ChatId {
        ChatId::new("628111")
    }

    struct Fixture {
        store: Arc<MemoryConversationStore>,
        messenger: Arc<RecordingMessenger>,
        hub: ObserverHub,
        dispatcher: Dispatcher,
    }

    fn fixture(replies: Vec<Content>) -> Fixture {
        fixture_with_resolver(replies, Arc::new(FixedResolver))
    }

    fn fixture_with_resolver(
        replies: Vec<Content>,
        resolver: Arc<dyn MediaResolver>,
    ) -> Fixture {
        let store = Arc::new(MemoryConversationStore::new());
        let messenger = Arc::new(RecordingMessenger::default());
        let hub = ObserverHub::new();
        let config = OrchestratorConfig::new("Jawab singkat.");
        let apology = config.apology.clone();
        let orchestrator = Arc::new(Orchestrator::new(
            ScriptedBackend::new(replies),
            Arc::new(ToolRegistry::new()),
            store.clone(),
            messenger.clone(),
            config,
        ));
        let dispatcher = Dispatcher::new(
            store.clone(),
            orchestrator,
            resolver,
            messenger.clone(),
            hub.clone(),
            apology,
        );
        Fixture {
            store,
            messenger,
            hub,
            dispatcher,
        }
    }

    fn text_event(text: &str) -> InboundEvent {
        InboundEvent {
            from: chat(),
            text: Some(text.to_string()),
            media: None,
        }
    }

    #[tokio::test]
    async fn first_message_publishes_new_conversation() {
        let fx = fixture(vec![Content::model(vec![Part::text("hai")])]);
        let mut rx = fx.hub.subscribe();
        fx.dispatcher.handle(text_event("halo")).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ObserverEvent::NewConversation { chat_id: chat() }
        );
        assert_eq!(fx.messenger.sent(), vec![(chat(), "hai".to_string())]);
    }

    #[tokio::test]
    async fn known_chat_does_not_republish_new_conversation() {
        let fx = fixture(vec![
            Content::model(vec![Part::text("hai")]),
            Content::model(vec![Part::text("baik")]),
        ]);
        fx.dispatcher.handle(text_event("halo")).await;
        let mut rx = fx.hub.subscribe();
        fx.dispatcher.handle(text_event("apa kabar")).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn clear_command_wipes_history_and_confirms() {
        let fx = fixture(vec![Content::model(vec![Part::text("hai")])]);
        fx.dispatcher.handle(text_event("halo")).await;
        assert!(fx.store.exists(&chat()).await.unwrap());

        fx.dispatcher.handle(text_event("  Clear ")).await;
        assert!(!fx.store.exists(&chat()).await.unwrap());
        assert_eq!(
            fx.messenger.sent().last().unwrap().1,
            CLEAR_CONFIRMATION.to_string()
        );
    }

    #[tokio::test]
    async fn clear_wipes_history_even_under_admin_control() {
        let fx = fixture(vec![Content::model(vec![Part::text("hai")])]);
        fx.dispatcher.handle(text_event("halo")).await;
        fx.store
            .set_control(&chat(), ControlState::Admin)
            .await
            .unwrap();

        fx.dispatcher.handle(text_event("clear")).await;
        assert!(!fx.store.exists(&chat()).await.unwrap());
        assert_eq!(
            fx.messenger.sent().last().unwrap().1,
            CLEAR_CONFIRMATION.to_string()
        );
    }

    #[tokio::test]
    async fn failed_media_without_text_stops_silently() {
        let fx = fixture_with_resolver(vec![], Arc::new(FailingResolver));
        fx.dispatcher
            .handle(InboundEvent {
                from: chat(),
                text: None,
                media: Some(InboundMedia {
                    id: "media-1".to_string(),
                    caption: None,
                }),
            })
            .await;

        // No placeholder reaches the model, nothing is stored or sent.
        assert!(!fx.store.exists(&chat()).await.unwrap());
        assert!(fx.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_media_with_caption_falls_back_to_text_only() {
        let fx = fixture_with_resolver(
            vec![Content::model(vec![Part::text("baik")])],
            Arc::new(FailingResolver),
        );
        fx.dispatcher
            .handle(InboundEvent {
                from: chat(),
                text: None,
                media: Some(InboundMedia {
                    id: "media-1".to_string(),
                    caption: Some("lihat ini".to_string()),
                }),
            })
            .await;

        let turns = fx.store.full_history(&chat()).await.unwrap();
        let input = turns[0].user.as_ref().unwrap();
        assert_eq!(input.parts, vec![Part::text("lihat ini")]);
    }

    #[tokio::test]
    async fn admin_control_bypasses_the_model() {
        let fx = fixture(vec![]);
        fx.store
            .set_control(&chat(), ControlState::Admin)
            .await
            .unwrap();
        let mut rx = fx.hub.subscribe();
        fx.dispatcher.handle(text_event("tolong dibantu")).await;

        // Stored as a user-only turn, nothing sent, observers notified.
        let turns = fx.store.full_history(&chat()).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].bot.is_none());
        assert!(fx.messenger.sent().is_empty());
        match rx.recv().await.unwrap() {
            ObserverEvent::NewMessage { chat_id, message } => {
                assert_eq!(chat_id, chat());
                assert!(message.bot.is_none());
            }
            other => panic!("expected new_message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn media_without_caption_gets_fallback_text() {
        let fx = fixture(vec![Content::model(vec![Part::text("gambar diterima")])]);
        fx.dispatcher
            .handle(InboundEvent {
                from: chat(),
                text: None,
                media: Some(InboundMedia {
                    id: "media-1".to_string(),
                    caption: None,
                }),
            })
            .await;

        let turns = fx.store.full_history(&chat()).await.unwrap();
        let input = turns[0].user.as_ref().unwrap();
        assert_eq!(input.role, Role::User);
        assert_eq!(input.parts.len(), 2);
        assert_eq!(input.text_joined(), MEDIA_FALLBACK_CAPTION);
        assert!(matches!(
            &input.parts[1],
            Part::FileData { file_uri, .. } if file_uri == "files/media-1"
        ));
    }

    #[tokio::test]
    async fn empty_message_is_ignored() {
        let fx = fixture(vec![]);
        fx.dispatcher
            .handle(InboundEvent {
                from: chat(),
                text: Some("   ".to_string()),
                media: None,
            })
            .await;

        assert!(!fx.store.exists(&chat()).await.unwrap());
        assert!(fx.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn admin_reply_is_stored_sent_and_broadcast() {
        let fx = fixture(vec![]);
        let mut rx = fx.hub.subscribe();
        fx.dispatcher
            .admin_reply(&chat(), "sebentar ya")
            .await
            .unwrap();

        let turns = fx.store.full_history(&chat()).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].bot.as_ref().unwrap().role, Role::Admin);
        assert_eq!(
            fx.messenger.sent(),
            vec![(chat(), "sebentar ya".to_string())]
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            ObserverEvent::NewMessage { .. }
        ));
    }
}
