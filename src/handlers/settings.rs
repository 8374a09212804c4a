use axum::{extract::State, response::IntoResponse};

use crate::{
    core::error::AppError,
    dtos::{response::ApiResponse, setting::UpdateSettingsRequest},
    extractors::payload::ValidatedJson,
    services::setting as SettingService,
    state::AppState,
};

pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::with_data(SettingService::get_all(&state.db).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::with_data(SettingService::update(&state.db, payload).await?))
}
