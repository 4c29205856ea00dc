use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use domains::Booking;
use serde::Deserialize;
use services::PaymentIntent;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, AuthUser, PageQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-intent", post(create_intent))
        .route("/confirm", post(confirm))
        .route("/history", get(history))
}

#[derive(Debug, Deserialize)]
pub struct IntentBody {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    pub booking_id: Uuid,
    pub payment_intent_id: String,
}

async fn create_intent(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<IntentBody>,
) -> ApiResult<ApiResponse<PaymentIntent>> {
    Ok(ApiResponse::ok(state.services.payments.create_intent(&actor, body.booking_id).await?))
}

async fn confirm(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<ConfirmBody>,
) -> ApiResult<ApiResponse<Booking>> {
    let booking = state
        .services
        .payments
        .confirm(&actor, body.booking_id, &body.payment_intent_id)
        .await?;
    Ok(ApiResponse::ok(booking).with_message("payment confirmed"))
}

async fn history(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Vec<Booking>>> {
    Ok(ApiResponse::ok(state.services.payments.history(&actor, page.into()).await?))
}
