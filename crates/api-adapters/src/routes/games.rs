use axum::extract::State;
use axum::routing::get;
use axum::Router;
use domains::{Game, GameUpdate, NewGame, Review};
use serde::Deserialize;
use services::{GameQuery, Listing};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, PageQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/mine", get(list_mine))
        .route("/{id}", get(get_one).put(update).delete(cancel))
        .route("/{id}/reviews", get(list_reviews).post(create_review))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub rating: u8,
    pub comment: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GameQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Listing<Game>>> {
    Ok(ApiResponse::ok(state.services.games.list(query, page.into()).await?))
}

async fn list_mine(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Listing<Game>>> {
    Ok(ApiResponse::ok(state.services.games.list_mine(&actor, page.into()).await?))
}

async fn get_one(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ApiResponse<Game>> {
    Ok(ApiResponse::ok(state.services.games.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(input): ApiJson<NewGame>,
) -> ApiResult<ApiResponse<Game>> {
    Ok(ApiResponse::created(state.services.games.create(&actor, input).await?))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<GameUpdate>,
) -> ApiResult<ApiResponse<Game>> {
    Ok(ApiResponse::ok(state.services.games.update(&actor, id, update).await?))
}

/// Deleting from the GM's side cancels: the record stays for booking history.
async fn cancel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Game>> {
    let game = state.services.games.cancel(&actor, id).await?;
    Ok(ApiResponse::ok(game).with_message("game cancelled"))
}

async fn list_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<Review>>> {
    Ok(ApiResponse::ok(state.services.reviews.list_for_game(id).await?))
}

async fn create_review(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReviewBody>,
) -> ApiResult<ApiResponse<Review>> {
    let review = state.services.reviews.create(&actor, id, body.rating, body.comment).await?;
    Ok(ApiResponse::created(review))
}
