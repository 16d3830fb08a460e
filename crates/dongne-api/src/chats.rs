use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use dongne_types::api::{CreateChatRequest, FieldError, NewMessage, SendMessageRequest};
use dongne_types::events::ServerEvent;
use dongne_types::models::{Chat, ChatId};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

pub const MAX_MESSAGE_CHARS: usize = 1000;

/// GET /api/chats
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let chats = blocking(&state, move |db| db.list_chats_for_user(&user.id)).await?;
    Ok(Json(chats))
}

/// POST /api/chats
///
/// The caller is always the buyer; an existing chat for the same
/// (item, seller, buyer) is returned instead of a new one.
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.seller_id == user.id {
        return Err(ApiError::BadRequest("You cannot start a chat about your own item".into()));
    }

    let chat = blocking(&state, move |db| {
        let matches_seller = db
            .get_item(req.item_id, None)?
            .is_some_and(|item| item.item.seller_id == req.seller_id);
        if !matches_seller {
            return Ok(None);
        }
        db.get_or_create_chat(req.item_id, &req.seller_id, &user.id).map(Some)
    })
    .await?;

    chat.map(Json)
        .ok_or_else(|| ApiError::NotFound("Item not found".into()))
}

/// GET /api/chats/{id}
pub async fn get_chat(
    State(state): State<AppState>,
    ApiPath(chat_id): ApiPath<ChatId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let details = blocking(&state, move |db| db.get_chat_with_messages(chat_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))?;

    ensure_participant(&details.chat, &user)?;
    Ok(Json(details))
}

/// POST /api/chats/{id}/messages
///
/// Persists first, then fans the stored message out to sockets in the room.
/// Insert and broadcast happen under one lock so delivery order matches ids.
pub async fn send_message(
    State(state): State<AppState>,
    ApiPath(chat_id): ApiPath<ChatId>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chars = req.content.chars().count();
    if req.content.trim().is_empty() {
        return Err(ApiError::validation(
            "Invalid message data",
            vec![FieldError::new("content", "Message must not be empty")],
        ));
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(ApiError::validation(
            "Invalid message data",
            vec![FieldError::new(
                "content",
                format!("Message must be at most {MAX_MESSAGE_CHARS} characters"),
            )],
        ));
    }

    let chat = blocking(&state, move |db| db.get_chat(chat_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))?;
    ensure_participant(&chat, &user)?;

    let new = NewMessage {
        chat_id,
        sender_id: user.id,
        content: req.content,
        message_type: req.message_type,
    };
    let _ordered = state.message_order.lock().await;
    let message = blocking(&state, move |db| db.create_message(&new)).await?;

    let delivered = state
        .rooms
        .broadcast(
            chat_id,
            ServerEvent::NewMessage {
                message: message.clone(),
            },
        )
        .await;
    debug!("Message {} in chat {} delivered to {} sockets", message.id, chat_id, delivered);

    Ok((StatusCode::CREATED, Json(message)))
}

fn ensure_participant(chat: &Chat, user: &CurrentUser) -> Result<(), ApiError> {
    if chat.is_participant(&user.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("You are not a participant in this chat".into()))
    }
}
