use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chat_session::{ErrorResponse, Message, SendMessageRequest, SendMessageResponse};
use tracing::{debug, error};

use crate::AppState;

async fn load_history(state: &AppState, chat_id: &str) -> chat_session::Result<Vec<Message>> {
    let chat = state.session.get_chat_by_id(chat_id).await?;
    state
        .session
        .fetch_messages(&chat, state.server_config.fetch_limit)
        .await
}

/// `GET /api/messages/{chat_id}`: the most recent messages of one chat.
pub async fn get_messages(State(state): State<AppState>, Path(chat_id): Path<String>) -> Response {
    match load_history(&state, &chat_id).await {
        Ok(messages) => {
            debug!("Returning {} messages for {}", messages.len(), chat_id);
            Json(messages).into_response()
        }
        Err(e) => {
            error!("Error fetching messages for {}: {}", chat_id, e);
            state.metrics.request_error();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch messages".to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn send_failed(state: &AppState, reason: String) -> Response {
    state.metrics.request_error();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(SendMessageResponse::failed(reason)),
    )
        .into_response()
}

/// `POST /api/messages/send-message`: send a text to one chat.
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            error!("Malformed send request: {}", rejection.body_text());
            return send_failed(&state, rejection.body_text());
        }
    };

    let chat = match state.session.get_chat_by_id(&req.chat_id).await {
        Ok(chat) => chat,
        Err(e) => {
            error!("Error sending message to {}: {}", req.chat_id, e);
            return send_failed(&state, e.to_string());
        }
    };

    match state.session.send_message(&chat, &req.message).await {
        Ok(()) => {
            state.metrics.message_sent();
            Json(SendMessageResponse::ok()).into_response()
        }
        Err(e) => {
            error!("Error sending message to {}: {}", req.chat_id, e);
            send_failed(&state, e.to_string())
        }
    }
}
