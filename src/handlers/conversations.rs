use super::common::{AppJson, AppPath};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::conversations::{
        ConversationSummary, MarkReadResponse, MessageResponse, SendMessageInput,
        StartConversationInput, StartedConversation,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

pub async fn start_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<StartConversationInput>,
) -> Result<(StatusCode, Json<StartedConversation>), ServiceError> {
    let started = state
        .services
        .conversations
        .start_conversation(&user, input)
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationSummary>>, ServiceError> {
    Ok(Json(
        state.services.conversations.list_conversations(&user).await?,
    ))
}

pub async fn get_messages(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
) -> Result<Json<Vec<MessageResponse>>, ServiceError> {
    Ok(Json(
        state
            .services
            .conversations
            .get_messages(&user, conversation_id)
            .await?,
    ))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
    AppJson(input): AppJson<SendMessageInput>,
) -> Result<(StatusCode, Json<MessageResponse>), ServiceError> {
    let message = state
        .services
        .conversations
        .send_message(&user, conversation_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
) -> Result<Json<MarkReadResponse>, ServiceError> {
    Ok(Json(
        state
            .services
            .conversations
            .mark_read(&user, conversation_id)
            .await?,
    ))
}
