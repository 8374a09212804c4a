use axum::{extract::State, response::IntoResponse};

use crate::{
    core::error::AppError,
    dtos::{auth::Claims, response::ApiResponse, user::UpdateUserRequest},
    extractors::payload::ValidatedJson,
    services::user as UserService,
    state::AppState,
    rate_limit,
};

/// 当前登录用户的资料。每个用户每分钟最多 60 次。
pub async fn get_me(
    claims: Claims,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    rate_limit!(&state.redis, "read_me", &claims.sub, 60, 60);

    let profile = UserService::get_user_profile(&state.db, &claims.sub).await?;
    Ok(ApiResponse::with_data(profile))
}

/// 更新当前登录用户的资料
pub async fn update_me(
    claims: Claims,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    rate_limit!(&state.redis, "update_me", &claims.sub, 10, 60);

    let profile = UserService::update_user_profile(&state.db, &claims.sub, payload).await?;
    Ok(ApiResponse::with_data(profile))
}
