use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::{permission::SavePermissionsRequest, response::ApiResponse},
    extractors::payload::ValidatedJson,
    services::permission as PermissionService,
    state::AppState,
};

#[derive(serde::Serialize)]
struct ModuleDto {
    id: i32,
    name: String,
}

pub async fn list_modules(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let modules: Vec<ModuleDto> = PermissionService::list_modules(&state.db)
        .await?
        .into_iter()
        .map(|m| ModuleDto { id: m.id, name: m.name })
        .collect();
    Ok(ApiResponse::with_data(modules))
}

pub async fn get_matrix(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::with_data(PermissionService::load_matrix(&state.db, role_id).await?))
}

pub async fn save_matrix(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SavePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::with_data(
        PermissionService::save_matrix(&state.db, role_id, payload).await?,
    ))
}
