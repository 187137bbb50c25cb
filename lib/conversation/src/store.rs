//! Persistence contract for conversation history and control state.

use crate::content::Content;
use crate::error::StoreError;
use crate::turn::{ControlState, Turn};
use async_trait::async_trait;
use wicara_core::ChatId;

/// Storage boundary for conversations.
///
/// Implementations persist turns in arrival order and enforce the
/// per-conversation history cap. All operations are keyed by [`ChatId`].
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends one turn, evicting the oldest turn when the cap is reached.
    ///
    /// Returns [`StoreError::EmptyTurn`] when both segments are `None`.
    async fn append_turn(
        &self,
        chat_id: &ChatId,
        user: Option<Content>,
        bot: Option<Content>,
    ) -> Result<(), StoreError>;

    /// Loads the model-visible history in chronological order.
    ///
    /// Absent segments and admin-role segments are skipped; the model never
    /// sees operator takeover traffic.
    async fn load_history(&self, chat_id: &ChatId) -> Result<Vec<Content>, StoreError>;

    /// Returns `true` when the conversation has at least one stored turn.
    async fn exists(&self, chat_id: &ChatId) -> Result<bool, StoreError>;

    /// Deletes all stored turns for the conversation.
    async fn clear(&self, chat_id: &ChatId) -> Result<(), StoreError>;

    /// Returns who currently answers this conversation.
    ///
    /// Conversations with no recorded state default to [`ControlState::Bot`].
    async fn get_control(&self, chat_id: &ChatId) -> Result<ControlState, StoreError>;

    /// Records who answers this conversation. Idempotent.
    async fn set_control(&self, chat_id: &ChatId, state: ControlState)
    -> Result<(), StoreError>;

    /// Lists every known chat id, most recently active first.
    async fn list_chats(&self) -> Result<Vec<ChatId>, StoreError>;

    /// Loads the complete stored turns, including admin segments.
    ///
    /// Operator views use this; the model path uses [`Self::load_history`].
    async fn full_history(&self, chat_id: &ChatId) -> Result<Vec<Turn>, StoreError>;

    /// Appends an operator reply as a bot-side segment with admin role.
    async fn append_admin_reply(&self, chat_id: &ChatId, text: &str) -> Result<(), StoreError>;
}
