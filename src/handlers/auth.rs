// src/handlers/auth.rs
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    core::error::AppError,
    dtos::{
        auth::{LoginRequest, RefreshRequest, RegisterRequest},
        response::ApiResponse,
    },
    extractors::payload::ValidatedJson,
    services::auth as AuthService,
    state::AppState,
    rate_limit,
};

/// 创建后台账号（仅 super-admin / admin）。按用户名限流，每 60 秒最多 5 次。
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    rate_limit!(&state.redis, "register", &payload.username, 5, 60);

    let profile = AuthService::register(&state, payload).await?;

    Ok(ApiResponse::with_code(
        StatusCode::CREATED,
        "User registered successfully",
        Some(profile),
    ))
}

/// 登录。按账号限流，防止暴力破解。
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    rate_limit!(&state.redis, "login", &payload.account, 5, 60);

    let response = AuthService::login(&state, payload).await?;
    Ok(ApiResponse::with_data(response))
}

/// 使用刷新令牌换取新的令牌对
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = AuthService::refresh(&state, payload.refresh_token).await?;
    Ok(ApiResponse::with_data(response))
}

/// 登出：当前访问令牌加入黑名单
pub async fn logout(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, AppError> {
    AuthService::logout(&state, bearer.token()).await?;
    Ok(ApiResponse::<()>::with_message("Logged out successfully"))
}
