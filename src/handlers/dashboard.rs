use axum::{extract::State, response::IntoResponse};

use crate::{
    core::error::AppError,
    dtos::response::ApiResponse,
    services::catalog::dashboard_stats,
    state::AppState,
};

/// 各目录种类的记录总数与启用数
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::with_data(dashboard_stats(&state.db).await?))
}
