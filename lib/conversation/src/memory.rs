//! In-memory store used by tests and local development.

use crate::content::{Content, Role};
use crate::error::StoreError;
use crate::store::ConversationStore;
use crate::turn::{ControlState, Turn};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use wicara_core::ChatId;

const DEFAULT_MAX_TURNS: usize = 10;

#[derive(Default)]
struct Inner {
    turns: HashMap<ChatId, Vec<Turn>>,
    control: HashMap<ChatId, ControlState>,
    recency: Vec<ChatId>,
}

impl Inner {
    fn touch(&mut self, chat_id: &ChatId) {
        self.recency.retain(|id| id != chat_id);
        self.recency.insert(0, chat_id.clone());
    }
}

/// [`ConversationStore`] backed by process memory.
///
/// Keeps the same history cap semantics as the durable store so engine tests
/// exercise eviction the way production does.
pub struct MemoryConversationStore {
    inner: Mutex<Inner>,
    max_turns: usize,
}

impl MemoryConversationStore {
    /// Creates an empty store with the default ten-turn cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_turns(DEFAULT_MAX_TURNS)
    }

    /// Creates an empty store with an explicit per-conversation cap.
    #[must_use]
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_turns,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Poisoning only happens if another holder panicked; propagating the
        // inner state is still sound for plain data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn append_turn(
        &self,
        chat_id: &ChatId,
        user: Option<Content>,
        bot: Option<Content>,
    ) -> Result<(), StoreError> {
        if user.is_none() && bot.is_none() {
            return Err(StoreError::EmptyTurn);
        }
        let mut inner = self.lock();
        let turns = inner.turns.entry(chat_id.clone()).or_default();
        if turns.len() >= self.max_turns {
            turns.remove(0);
        }
        turns.push(Turn::new(user, bot));
        inner.touch(chat_id);
        Ok(())
    }

    async fn load_history(&self, chat_id: &ChatId) -> Result<Vec<Content>, StoreError> {
        let inner = self.lock();
        let turns = inner.turns.get(chat_id).map(Vec::as_slice).unwrap_or(&[]);
        let mut history = Vec::new();
        for turn in turns {
            for segment in [&turn.user, &turn.bot] {
                if let Some(content) = segment {
                    if content.role != Role::Admin {
                        history.push(content.clone());
                    }
                }
            }
        }
        Ok(history)
    }

    async fn exists(&self, chat_id: &ChatId) -> Result<bool, StoreError> {
        let inner = self.lock();
        Ok(inner.turns.get(chat_id).is_some_and(|t| !t.is_empty()))
    }

    async fn clear(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.turns.remove(chat_id);
        // A cleared conversation has no turns, so it leaves the listing,
        // matching the durable store where listings derive from turns.
        inner.recency.retain(|id| id != chat_id);
        Ok(())
    }

    async fn get_control(&self, chat_id: &ChatId) -> Result<ControlState, StoreError> {
        let inner = self.lock();
        Ok(inner
            .control
            .get(chat_id)
            .copied()
            .unwrap_or(ControlState::Bot))
    }

    async fn set_control(
        &self,
        chat_id: &ChatId,
        state: ControlState,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.control.insert(chat_id.clone(), state);
        Ok(())
    }

    async fn list_chats(&self) -> Result<Vec<ChatId>, StoreError> {
        let inner = self.lock();
        Ok(inner.recency.clone())
    }

    async fn full_history(&self, chat_id: &ChatId) -> Result<Vec<Turn>, StoreError> {
        let inner = self.lock();
        Ok(inner.turns.get(chat_id).cloned().unwrap_or_default())
    }

    async fn append_admin_reply(&self, chat_id: &ChatId, text: &str) -> Result<(), StoreError> {
        self.append_turn(chat_id, None, Some(Content::admin_text(text)))
            .await
    }
}
