//! HTTP routes: webhook, operator API, observer socket.

use crate::error::ApiError;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::{ServeDir, ServeFile};
use wicara_conversation::{ControlState, ConversationStore};
use wicara_core::ChatId;
use wicara_engine::{Dispatcher, InboundEvent, InboundMedia, ObserverHub};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Inbound message dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Conversation store, for the operator API.
    pub store: Arc<dyn ConversationStore>,
    /// Observer fan-out hub.
    pub hub: ObserverHub,
    /// Token the webhook verification handshake must present.
    pub verify_token: String,
}

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/whatsapp/webhook",
            get(verify_webhook).post(receive_webhook),
        )
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/{chat_id}", get(get_conversation))
        .route(
            "/api/conversations/{chat_id}/control",
            get(get_control).post(set_control),
        )
        .route("/api/conversations/{chat_id}/reply", post(post_reply))
        .route("/ws/all", any(observer_socket))
        .route_service("/admin", ServeFile::new("static/admin.html"))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

/// Webhook verification handshake.
///
/// Meta sends `hub.mode`, `hub.verify_token`, and `hub.challenge`; the
/// challenge is echoed back only when the token matches.
async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, ApiError> {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");
    match (mode, token, challenge) {
        (Some("subscribe"), Some(token), Some(challenge))
            if token == state.verify_token =>
        {
            Ok(challenge.clone())
        }
        _ => {
            tracing::warn!("webhook verification rejected");
            Err(ApiError::VerificationFailed)
        }
    }
}

/// Inbound webhook delivery.
///
/// Always answers 200 immediately; each message is processed on its own
/// task so slow generations never trigger provider retries.
async fn receive_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    for event in payload_to_events(payload) {
        let dispatcher = state.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.handle(event).await;
        });
    }
    StatusCode::OK
}

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let chats = state.store.list_chats().await?;
    Ok(Json(json!({"conversations": chats})))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chat_id = ChatId::new(chat_id);
    let turns = state.store.full_history(&chat_id).await?;
    Ok(Json(json!({"chat_id": chat_id, "messages": turns})))
}

async fn get_control(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let control = state.store.get_control(&ChatId::new(chat_id)).await?;
    Ok(Json(json!({"control": control})))
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    control: ControlState,
}

async fn set_control(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<ControlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .set_control(&ChatId::new(chat_id), request.control)
        .await?;
    Ok(Json(json!({"control": request.control})))
}

#[derive(Debug, Deserialize)]
struct ReplyRequest {
    message: String,
}

async fn post_reply(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<ReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest {
            reason: "message must not be empty".to_string(),
        });
    }
    state
        .dispatcher
        .admin_reply(&ChatId::new(chat_id), &request.message)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Observer socket: streams every hub event to the client as JSON.
async fn observer_socket(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_events(socket, state.hub))
}

async fn forward_events(mut socket: WebSocket, hub: ObserverHub) {
    let mut rx = hub.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            // A slow client that missed events just keeps going from the
            // current position.
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "observer fell behind");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

/// One webhook delivery from the Cloud API.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
struct WebhookChange {
    value: WebhookValue,
}

#[derive(Debug, Deserialize)]
struct WebhookValue {
    #[serde(default)]
    messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    from: String,
    text: Option<WebhookText>,
    image: Option<WebhookMedia>,
    video: Option<WebhookMedia>,
    document: Option<WebhookMedia>,
}

#[derive(Debug, Deserialize)]
struct WebhookText {
    body: String,
}

#[derive(Debug, Deserialize)]
struct WebhookMedia {
    id: String,
    caption: Option<String>,
}

/// Flattens a webhook delivery into inbound events.
fn payload_to_events(payload: WebhookPayload) -> Vec<InboundEvent> {
    let mut events = Vec::new();
    for entry in payload.entry {
        for change in entry.changes {
            for message in change.value.messages {
                let media = message
                    .image
                    .or(message.video)
                    .or(message.document)
                    .map(|m| InboundMedia {
                        id: m.id,
                        caption: m.caption,
                    });
                events.push(InboundEvent {
                    from: ChatId::new(message.from),
                    text: message.text.map(|t| t.body),
                    media,
                });
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_message_parses_into_event() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "628111",
                            "type": "text",
                            "text": {"body": "halo"}
                        }]
                    }
                }]
            }]
        }))
        .unwrap();
        let events = payload_to_events(payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, ChatId::new("628111"));
        assert_eq!(events[0].text.as_deref(), Some("halo"));
        assert!(events[0].media.is_none());
    }

    #[test]
    fn image_message_carries_media_reference() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "628111",
                            "type": "image",
                            "image": {"id": "media-9", "caption": "lihat ini"}
                        }]
                    }
                }]
            }]
        }))
        .unwrap();
        let events = payload_to_events(payload);
        assert_eq!(
            events[0].media,
            Some(InboundMedia {
                id: "media-9".to_string(),
                caption: Some("lihat ini".to_string()),
            })
        );
    }

    #[test]
    fn status_only_delivery_produces_no_events() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{
                "changes": [{
                    "value": {"statuses": [{"id": "wamid.x", "status": "delivered"}]}
                }]
            }]
        }))
        .unwrap();
        assert!(payload_to_events(payload).is_empty());
    }

    #[test]
    fn multiple_messages_flatten_in_order() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [
                            {"from": "628111", "type": "text", "text": {"body": "satu"}},
                            {"from": "628222", "type": "text", "text": {"body": "dua"}}
                        ]
                    }
                }]
            }]
        }))
        .unwrap();
        let events = payload_to_events(payload);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].from, ChatId::new("628222"));
    }
}
