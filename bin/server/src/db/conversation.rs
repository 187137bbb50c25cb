//! Postgres-backed conversation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use wicara_conversation::{Content, ControlState, ConversationStore, Role, StoreError, Turn};
use wicara_core::ChatId;

/// Per-conversation cap on stored turns.
const MAX_TURNS: i64 = 10;

/// Row type for turn queries.
#[derive(FromRow)]
struct TurnRow {
    user_content: Option<serde_json::Value>,
    bot_content: Option<serde_json::Value>,
}

impl TurnRow {
    fn try_into_turn(self) -> Result<Turn, StoreError> {
        let decode = |value: Option<serde_json::Value>| -> Result<Option<Content>, StoreError> {
            value
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| StoreError::InvalidData {
                    reason: format!("malformed stored content: {e}"),
                })
        };
        Ok(Turn::new(decode(self.user_content)?, decode(self.bot_content)?))
    }
}

/// Repository implementing [`ConversationStore`] over Postgres.
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    /// Creates a new repository.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_turns(&self, chat_id: &ChatId) -> Result<Vec<Turn>, StoreError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            r#"
            SELECT user_content, bot_content
            FROM conversation_turns
            WHERE chat_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(chat_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        rows.into_iter().map(TurnRow::try_into_turn).collect()
    }
}

fn storage_error(err: sqlx::Error) -> StoreError {
    StoreError::StorageFailed {
        reason: err.to_string(),
    }
}

fn encode(content: &Content) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(content).map_err(|e| StoreError::InvalidData {
        reason: format!("failed to encode content: {e}"),
    })
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    async fn append_turn(
        &self,
        chat_id: &ChatId,
        user: Option<Content>,
        bot: Option<Content>,
    ) -> Result<(), StoreError> {
        if user.is_none() && bot.is_none() {
            return Err(StoreError::EmptyTurn);
        }
        let user_json = user.as_ref().map(encode).transpose()?;
        let bot_json = bot.as_ref().map(encode).transpose()?;

        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        sqlx::query(
            r#"
            INSERT INTO conversation_turns (chat_id, user_content, bot_content)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(chat_id.as_str())
        .bind(user_json)
        .bind(bot_json)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        // Enforce the history cap by dropping the oldest turn once over it.
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM conversation_turns WHERE chat_id = $1",
        )
        .bind(chat_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;
        if count > MAX_TURNS {
            sqlx::query(
                r#"
                DELETE FROM conversation_turns
                WHERE id IN (
                    SELECT id FROM conversation_turns
                    WHERE chat_id = $1
                    ORDER BY id ASC
                    LIMIT $2
                )
                "#,
            )
            .bind(chat_id.as_str())
            .bind(count - MAX_TURNS)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        }
        tx.commit().await.map_err(storage_error)
    }

    async fn load_history(&self, chat_id: &ChatId) -> Result<Vec<Content>, StoreError> {
        let turns = self.fetch_turns(chat_id).await?;
        let mut history = Vec::new();
        for turn in turns {
            for segment in [turn.user, turn.bot] {
                if let Some(content) = segment {
                    if content.role != Role::Admin {
                        history.push(content);
                    }
                }
            }
        }
        Ok(history)
    }

    async fn exists(&self, chat_id: &ChatId) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM conversation_turns WHERE chat_id = $1)",
        )
        .bind(chat_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }

    async fn clear(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM conversation_turns WHERE chat_id = $1")
            .bind(chat_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn get_control(&self, chat_id: &ChatId) -> Result<ControlState, StoreError> {
        let state: Option<String> = sqlx::query_scalar(
            "SELECT state FROM conversation_control WHERE chat_id = $1",
        )
        .bind(chat_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        match state {
            None => Ok(ControlState::Bot),
            Some(raw) => ControlState::from_str(&raw).map_err(|e| StoreError::InvalidData {
                reason: e.to_string(),
            }),
        }
    }

    async fn set_control(
        &self,
        chat_id: &ChatId,
        state: ControlState,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO conversation_control (chat_id, state, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (chat_id)
            DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()
            "#,
        )
        .bind(chat_id.as_str())
        .bind(state.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn list_chats(&self) -> Result<Vec<ChatId>, StoreError> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT chat_id, MAX(created_at) AS last_activity
            FROM conversation_turns
            GROUP BY chat_id
            ORDER BY last_activity DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(rows.into_iter().map(|(id, _)| ChatId::new(id)).collect())
    }

    async fn full_history(&self, chat_id: &ChatId) -> Result<Vec<Turn>, StoreError> {
        self.fetch_turns(chat_id).await
    }

    async fn append_admin_reply(&self, chat_id: &ChatId, text: &str) -> Result<(), StoreError> {
        self.append_turn(chat_id, None, Some(Content::admin_text(text)))
            .await
    }
}
