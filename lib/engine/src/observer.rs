//! Broadcast hub for operator-facing conversation events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use wicara_conversation::Content;
use wicara_core::ChatId;

const DEFAULT_CAPACITY: usize = 256;

/// One turn as shown to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// Inbound segment, if any.
    pub user: Option<Content>,
    /// Reply segment, if any.
    pub bot: Option<Content>,
}

/// Events published to connected observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ObserverEvent {
    /// A message arrived or was answered in an existing conversation.
    NewMessage {
        /// Conversation the turn belongs to.
        chat_id: ChatId,
        /// The turn that was appended.
        message: TurnSnapshot,
    },
    /// A first message arrived from a previously unseen chat id.
    NewConversation {
        /// The new conversation.
        chat_id: ChatId,
    },
}

/// Fan-out channel from the engine to observer sessions.
///
/// Publishing never blocks and never fails; events sent while no observer is
/// connected are dropped.
#[derive(Clone)]
pub struct ObserverHub {
    tx: broadcast::Sender<ObserverEvent>,
}

impl ObserverHub {
    /// Creates a hub with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a hub with an explicit per-subscriber buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: ObserverEvent) {
        // send only errors when there are no receivers, which is fine.
        let _ = self.tx.send(event);
    }

    /// Opens a new subscription.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ObserverEvent> {
        self.tx.subscribe()
    }
}

impl Default for ObserverHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wicara_conversation::Part;

    #[test]
    fn new_message_wire_shape() {
        let event = ObserverEvent::NewMessage {
            chat_id: ChatId::new("628111"),
            message: TurnSnapshot {
                user: Some(Content::user(vec![Part::text("halo")])),
                bot: None,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("new_message"));
        assert_eq!(value["data"]["chat_id"], json!("628111"));
        assert_eq!(value["data"]["message"]["bot"], json!(null));
    }

    #[test]
    fn new_conversation_wire_shape() {
        let event = ObserverEvent::NewConversation {
            chat_id: ChatId::new("628111"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("new_conversation"));
        assert_eq!(value["data"]["chat_id"], json!("628111"));
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let hub = ObserverHub::new();
        let mut rx = hub.subscribe();
        let event = ObserverEvent::NewConversation {
            chat_id: ChatId::new("628111"),
        };
        hub.publish(event.clone());
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let hub = ObserverHub::new();
        hub.publish(ObserverEvent::NewConversation {
            chat_id: ChatId::new("628111"),
        });
    }
}
