use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    core::{enums::ResourceKind, error::AppError},
    services::{catalog::CatalogRepository, role::RoleRepository},
    state::AppState,
};

/// 从路由层注入的 `Extension<ResourceKind>` 构造对应种类的仓储
impl FromRequestParts<AppState> for CatalogRepository {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let kind = parts
            .extensions
            .get::<ResourceKind>()
            .copied()
            .ok_or_else(|| {
                AppError::InternalServerError("Route is missing its resource kind".to_string())
            })?;

        Ok(CatalogRepository::new(state.db.clone(), state.uploads.clone(), kind))
    }
}

impl FromRequestParts<AppState> for RoleRepository {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(RoleRepository::new(state.db.clone()))
    }
}
