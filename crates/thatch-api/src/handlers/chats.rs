//! /chats handlers.

use axum::extract::State;

use thatch_core::wire::{
    ChatResponse, ChatsResponse, SendMessageRequest, SendMessageResponse, StartChatRequest,
    StartChatResponse,
};

use super::ApiState;
use crate::error::{ApiError, Json, Path};

// ── /chats (GET) ──────────────────────────────────────────────────────────────

pub async fn handle_list_chats(State(state): State<ApiState>) -> Json<ChatsResponse> {
    let mut chat_ids = state.node.list_chats();
    chat_ids.sort();
    Json(ChatsResponse { chat_ids })
}

// ── /chats/{id} (GET) ─────────────────────────────────────────────────────────

pub async fn handle_get_chat(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, ApiError> {
    Ok(Json(state.node.get_chat(&id)?))
}

// ── /chats (POST) ─────────────────────────────────────────────────────────────

pub async fn handle_start_chat(
    State(state): State<ApiState>,
    Json(req): Json<StartChatRequest>,
) -> Result<Json<StartChatResponse>, ApiError> {
    let chat_id = state.node.start_chat(&req.target).await?;
    Ok(Json(StartChatResponse { chat_id }))
}

// ── /chats/{id}/messages (POST) ───────────────────────────────────────────────

pub async fn handle_send_message(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let index = state.node.send_message(&id, &req.text).await?;
    tracing::debug!(chat = %id, index, "message sent via control plane");
    Ok(Json(SendMessageResponse { chat_id: id, index }))
}
