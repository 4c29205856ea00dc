use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use domains::{Favorite, Review, UserProfile, ProfileUpdate};
use serde::Deserialize;
use services::Listing;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, MaybeUser, PageQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gms", get(list_gms))
        .route("/search", get(search))
        .route("/profile", put(update_profile))
        .route("/favorites", get(list_favorites))
        .route("/favorites/{gm_id}", post(add_favorite).delete(remove_favorite))
        .route("/{id}", get(profile))
        .route("/{id}/reviews", get(gm_reviews))
}

#[derive(Debug, Default, Deserialize)]
pub struct GmQuery {
    pub system: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

async fn list_gms(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GmQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Listing<UserProfile>>> {
    let gms = state.services.users.list_gms(query.system, query.search, page.into()).await?;
    Ok(ApiResponse::ok(gms))
}

async fn search(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Vec<UserProfile>>> {
    Ok(ApiResponse::ok(state.services.users.search(&actor, &query.q, page.into()).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(state.services.users.update_profile(&actor, update).await?))
}

async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<ApiResponse<Vec<UserProfile>>> {
    Ok(ApiResponse::ok(state.services.users.list_favorites(&actor).await?))
}

async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(gm_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Favorite>> {
    Ok(ApiResponse::created(state.services.users.add_favorite(&actor, gm_id).await?))
}

async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(gm_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    state.services.users.remove_favorite(&actor, gm_id).await?;
    Ok(ApiResponse::message("removed from favorites"))
}

async fn profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(state.services.users.profile(viewer.as_ref(), id).await?))
}

async fn gm_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Vec<Review>>> {
    Ok(ApiResponse::ok(state.services.users.list_gm_reviews(id, page.into()).await?))
}
