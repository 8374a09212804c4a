use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    core::error::AppError,
    dtos::auth::Claims,
    services::auth::decode_access_token,
    state::AppState,
};

/// 自定义提取器：自动从 Header 中解析 Token 并验证
/// 如果验证失败，请求将直接被拒绝，不会进入 Handler
impl FromRequestParts<AppState> for Claims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // 中间件已经解析过的声明直接复用
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(claims.clone());
        }

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                AppError::AuthError("Missing or invalid Authorization header".to_string())
            })?;

        decode_access_token(&state.config, bearer.token())
    }
}
