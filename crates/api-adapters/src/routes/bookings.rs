use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use domains::Booking;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, PageQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(book))
        .route("/mine", get(list_mine))
        .route("/game/{game_id}", get(list_for_game))
        .route("/{id}/cancel", put(cancel))
}

fn one_seat() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct BookBody {
    pub game_id: Uuid,
    #[serde(default = "one_seat")]
    pub seats: i32,
}

async fn book(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<BookBody>,
) -> ApiResult<ApiResponse<Booking>> {
    let booking = state.services.bookings.book(&actor, body.game_id, body.seats).await?;
    Ok(ApiResponse::created(booking))
}

async fn list_mine(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Vec<Booking>>> {
    Ok(ApiResponse::ok(state.services.bookings.list_mine(&actor, page.into()).await?))
}

async fn list_for_game(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(game_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<Booking>>> {
    Ok(ApiResponse::ok(state.services.bookings.list_for_game(&actor, game_id).await?))
}

async fn cancel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Booking>> {
    let booking = state.services.bookings.cancel(&actor, id).await?;
    let message = if booking.payment_status == domains::PaymentStatus::Refunded {
        "booking cancelled and refunded"
    } else {
        "booking cancelled"
    };
    Ok(ApiResponse::ok(booking).with_message(message))
}
