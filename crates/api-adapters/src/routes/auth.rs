use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use domains::UserProfile;
use serde::Deserialize;
use services::{AuthSession, RegisterInput};

use super::throttle;
use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser, ClientIp};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/password", put(change_password))
        .route("/apply-gm", post(apply_gm))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplyGmBody {
    pub experience: String,
    #[serde(default)]
    pub systems: Vec<String>,
}

async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<RegisterInput>,
) -> ApiResult<ApiResponse<AuthSession>> {
    throttle(&state, &format!("register:{ip}")).await?;
    let session = state.services.auth.register(body).await?;
    Ok(ApiResponse::created(session).with_message("account created"))
}

async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<LoginBody>,
) -> ApiResult<ApiResponse<AuthSession>> {
    throttle(&state, &format!("login:{ip}")).await?;
    let session = state.services.auth.login(&body.email, &body.password).await?;
    Ok(ApiResponse::ok(session))
}

async fn me(State(state): State<AppState>, AuthUser(actor): AuthUser) -> ApiResult<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(state.services.auth.me(&actor).await?))
}

async fn change_password(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<PasswordBody>,
) -> ApiResult<ApiResponse<()>> {
    state
        .services
        .auth
        .change_password(&actor, &body.current_password, &body.new_password)
        .await?;
    Ok(ApiResponse::message("password updated"))
}

async fn apply_gm(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<ApplyGmBody>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let profile = state.services.auth.apply_gm(&actor, &body.experience, body.systems).await?;
    Ok(ApiResponse::ok(profile).with_message("application submitted"))
}
