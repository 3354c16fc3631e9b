use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::ApiError;
use crate::models::{ChatRequest, ChatResponse, ConversationTurn, SessionRequest};
use crate::render::render_reply;
use crate::state::AppState;

/// POST /api/chat - Answer one message within a session.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is required".to_string()));
    }
    let message = truncate_to_char_boundary(message, state.config.max_message_len);

    let _permit = state
        .chat_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Chat service at capacity".to_string(),
            )
        })?;

    let session_id = state.sessions.resolve(req.session_id);
    let history = state.sessions.history(session_id);

    let raw = state.engine.generate_response(&message, &history).await;
    let html = render_reply(&raw);

    state.sessions.record_exchange(
        session_id,
        ConversationTurn::user(message),
        ConversationTurn::bot(html.clone(), raw),
    );

    Ok(Json(ChatResponse {
        bot_response: html,
        session_id,
    }))
}

/// POST /api/chat/clear - Forget a session's turns.
pub async fn clear_chat(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> StatusCode {
    if !state.sessions.clear(req.session_id) {
        tracing::debug!("Clear requested for unknown session {}", req.session_id);
    }
    StatusCode::NO_CONTENT
}

/// GET /api/chat/history?session_id= - Turns so far, oldest first.
pub async fn history(
    State(state): State<AppState>,
    Query(req): Query<SessionRequest>,
) -> Json<Vec<ConversationTurn>> {
    Json(state.sessions.history(req.session_id))
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= max_len)
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_to_char_boundary("hello", 100), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let long = "a".repeat(3000);
        assert_eq!(truncate_to_char_boundary(&long, 2000).len(), 2000);
    }

    #[test]
    fn test_truncate_unicode_safe() {
        // 4-byte emoji straddles the limit and is dropped whole
        let result = truncate_to_char_boundary("Hello 🌍 world", 8);
        assert_eq!(result, "Hello ");
    }
}
