use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::Router;
use domains::{Game, GameStatus, Role, UserProfile};
use serde::{Deserialize, Serialize};
use services::{AdminStats, Audience, DeletedGame, GmApplicationView, Listing};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery, PageQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/users/{id}/status", put(set_status))
        .route("/users/{id}/role", put(set_role))
        .route("/gm-applications", get(list_applications))
        .route("/gm-applications/{user_id}", put(review_application))
        .route("/games", get(list_games))
        .route("/games/{id}", delete(delete_game))
        .route("/notifications/broadcast", post(broadcast))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GameQuery {
    pub status: Option<GameStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub action: Verdict,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteGameBody {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastBody {
    pub title: String,
    pub message: String,
    #[serde(default = "everyone")]
    pub audience: Audience,
}

fn everyone() -> Audience {
    Audience::All
}

#[derive(Debug, Serialize)]
pub struct BroadcastResult {
    pub recipients: u64,
}

async fn stats(State(state): State<AppState>, AdminUser(admin): AdminUser) -> ApiResult<ApiResponse<AdminStats>> {
    Ok(ApiResponse::ok(state.services.admin.stats(&admin).await?))
}

async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<UserQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Listing<UserProfile>>> {
    let users = state.services.admin.list_users(&admin, query.role, query.search, page.into()).await?;
    Ok(ApiResponse::ok(users))
}

async fn set_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let user = state.services.admin.set_user_active(&admin, id, body.is_active).await?;
    let message = if body.is_active { "user activated" } else { "user deactivated" };
    Ok(ApiResponse::ok(user).with_message(message))
}

async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RoleBody>,
) -> ApiResult<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(state.services.admin.set_user_role(&admin, id, body.role).await?))
}

async fn list_applications(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Listing<GmApplicationView>>> {
    Ok(ApiResponse::ok(state.services.admin.list_gm_applications(&admin, page.into()).await?))
}

async fn review_application(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReviewBody>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let approve = matches!(body.action, Verdict::Approve);
    let user = state.services.admin.review_gm_application(&admin, user_id, approve, body.notes).await?;
    let message = if approve { "application approved" } else { "application rejected" };
    Ok(ApiResponse::ok(user).with_message(message))
}

async fn list_games(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<GameQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Listing<Game>>> {
    let games = state.services.admin.list_games(&admin, query.status, query.search, page.into()).await?;
    Ok(ApiResponse::ok(games))
}

async fn delete_game(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<DeleteGameBody>,
) -> ApiResult<ApiResponse<DeletedGame>> {
    let deleted = state.services.admin.delete_game(&admin, id, &body.reason).await?;
    Ok(ApiResponse::ok(deleted).with_message("game deleted"))
}

async fn broadcast(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(body): ApiJson<BroadcastBody>,
) -> ApiResult<ApiResponse<BroadcastResult>> {
    let recipients = state
        .services
        .admin
        .broadcast(&admin, &body.title, &body.message, body.audience)
        .await?;
    Ok(ApiResponse::ok(BroadcastResult { recipients }).with_message("announcement sent"))
}
