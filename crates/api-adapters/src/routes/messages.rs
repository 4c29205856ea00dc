//! Conversations, friend requests, friends and notifications all live
//! under `/api/messages`.

use axum::extract::State;
use axum::routing::{delete, get, put};
use axum::Router;
use domains::{
    Conversation, ConversationSummary, FriendRequest, Friendship, Message, Notification, NotificationCategory,
    NotificationFilter, UserProfile,
};
use serde::{Deserialize, Serialize};
use services::FriendRequestView;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, PageQuery};
use crate::realtime::ServerEvent;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations).post(start_conversation))
        .route("/conversations/{id}/messages", get(list_messages).post(send_message))
        .route("/conversations/{id}/read", put(mark_conversation_read))
        .route("/friend-requests", get(incoming_requests).post(send_request))
        .route("/friend-requests/outgoing", get(outgoing_requests))
        .route("/friend-requests/{id}", put(respond_request).delete(cancel_request))
        .route("/friends", get(list_friends))
        .route("/friends/{user_id}", delete(remove_friend))
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_notifications_read))
        .route("/notifications/{id}/read", put(mark_notification_read))
        .route("/notifications/{id}", delete(delete_notification))
}

#[derive(Debug, Deserialize)]
pub struct StartConversationBody {
    pub participant_ids: Vec<Uuid>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    pub recipient_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Decline,
}

#[derive(Debug, Deserialize)]
pub struct RespondBody {
    pub action: Decision,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub category: Option<NotificationCategory>,
}

#[derive(Debug, Serialize)]
pub struct Count {
    pub count: u64,
}

async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<ApiResponse<Vec<ConversationSummary>>> {
    Ok(ApiResponse::ok(state.services.messages.list_conversations(&actor).await?))
}

async fn start_conversation(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<StartConversationBody>,
) -> ApiResult<ApiResponse<Conversation>> {
    let conversation = state.services.messages.start(&actor, body.participant_ids, body.name).await?;
    Ok(ApiResponse::ok(conversation))
}

async fn list_messages(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Vec<Message>>> {
    Ok(ApiResponse::ok(state.services.messages.list_messages(&actor, id, page.into()).await?))
}

/// Stores the message, then relays it to whoever has the room open.
async fn send_message(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SendMessageBody>,
) -> ApiResult<ApiResponse<Message>> {
    let (conversation, message) = state.services.messages.send(&actor, id, &body.content).await?;
    let delivered = state.hub.publish(
        conversation.id,
        ServerEvent::Message { conversation_id: conversation.id, message: message.clone() },
    );
    tracing::debug!(conversation_id = %conversation.id, delivered, "message relayed");
    Ok(ApiResponse::created(message))
}

async fn mark_conversation_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Count>> {
    let count = state.services.messages.mark_read(&actor, id).await?;
    Ok(ApiResponse::ok(Count { count }))
}

async fn send_request(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<FriendRequestBody>,
) -> ApiResult<ApiResponse<FriendRequest>> {
    let request = state.services.social.send_request(&actor, body.recipient_id, body.note).await?;
    Ok(ApiResponse::created(request).with_message("friend request sent"))
}

async fn incoming_requests(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<ApiResponse<Vec<FriendRequestView>>> {
    Ok(ApiResponse::ok(state.services.social.incoming(&actor).await?))
}

async fn outgoing_requests(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<ApiResponse<Vec<FriendRequestView>>> {
    Ok(ApiResponse::ok(state.services.social.outgoing(&actor).await?))
}

async fn respond_request(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RespondBody>,
) -> ApiResult<ApiResponse<Option<Friendship>>> {
    let accept = matches!(body.action, Decision::Accept);
    let friendship = state.services.social.respond(&actor, id, accept).await?;
    let message = if accept { "friend request accepted" } else { "friend request declined" };
    Ok(ApiResponse::ok(friendship).with_message(message))
}

async fn cancel_request(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    state.services.social.cancel_request(&actor, id).await?;
    Ok(ApiResponse::message("friend request cancelled"))
}

async fn list_friends(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<ApiResponse<Vec<UserProfile>>> {
    Ok(ApiResponse::ok(state.services.social.list_friends(&actor).await?))
}

async fn remove_friend(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    state.services.social.remove_friend(&actor, user_id).await?;
    Ok(ApiResponse::message("friend removed"))
}

async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(query): ApiQuery<NotificationQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Vec<Notification>>> {
    let filter = NotificationFilter { unread_only: query.unread_only, category: query.category };
    Ok(ApiResponse::ok(state.services.notifications.list(&actor, filter, page.into()).await?))
}

async fn unread_count(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<ApiResponse<Count>> {
    let count = state.services.notifications.unread_count(&actor).await?;
    Ok(ApiResponse::ok(Count { count }))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Notification>> {
    Ok(ApiResponse::ok(state.services.notifications.mark_read(&actor, id).await?))
}

async fn mark_all_notifications_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<ApiResponse<Count>> {
    let count = state.services.notifications.mark_all_read(&actor).await?;
    Ok(ApiResponse::ok(Count { count }))
}

async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    state.services.notifications.delete(&actor, id).await?;
    Ok(ApiResponse::message("notification deleted"))
}
