//! 通用资源处理器：对任意 [`Repository`] 实现提供列表 / 详情 / 新建 / 编辑 / 删除 / 切换状态。
//! 具体仓储由提取器构造，载荷类型由仓储的 `Input` 决定。

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::{catalog::ListQuery, response::ApiResponse},
    services::Repository,
    state::AppState,
};

pub async fn list<R>(repo: R, Query(query): Query<ListQuery>) -> Result<impl IntoResponse, AppError>
where
    R: Repository + FromRequestParts<AppState, Rejection = AppError>,
{
    let (rows, pagination) = repo.list(&query).await?;
    Ok(ApiResponse::with_page(rows, pagination))
}

pub async fn get<R>(repo: R, Path(id): Path<Uuid>) -> Result<impl IntoResponse, AppError>
where
    R: Repository + FromRequestParts<AppState, Rejection = AppError>,
{
    Ok(ApiResponse::with_data(repo.get(id).await?))
}

pub async fn create<R>(repo: R, input: R::Input) -> Result<impl IntoResponse, AppError>
where
    R: Repository + FromRequestParts<AppState, Rejection = AppError>,
    R::Input: FromRequest<AppState, Rejection = AppError>,
{
    let record = repo.create(input).await?;
    Ok(ApiResponse::with_code(StatusCode::CREATED, "created", Some(record)))
}

pub async fn update<R>(
    repo: R,
    Path(id): Path<Uuid>,
    input: R::Input,
) -> Result<impl IntoResponse, AppError>
where
    R: Repository + FromRequestParts<AppState, Rejection = AppError>,
    R::Input: FromRequest<AppState, Rejection = AppError>,
{
    Ok(ApiResponse::with_data(repo.update(id, input).await?))
}

pub async fn delete<R>(repo: R, Path(id): Path<Uuid>) -> Result<impl IntoResponse, AppError>
where
    R: Repository + FromRequestParts<AppState, Rejection = AppError>,
{
    repo.delete(id).await?;
    Ok(ApiResponse::<()>::with_message("deleted"))
}

pub async fn toggle_status<R>(repo: R, Path(id): Path<Uuid>) -> Result<impl IntoResponse, AppError>
where
    R: Repository + FromRequestParts<AppState, Rejection = AppError>,
{
    Ok(ApiResponse::with_data(repo.toggle_status(id).await?))
}
