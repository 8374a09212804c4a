use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};
use redis::AsyncCommands;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    core::{
        enums::{AdminRole, PermissionAction},
        error::AppError,
    },
    dtos::{auth::Claims, permission::PermissionFlags},
    services::{auth::blacklist_key, permission as PermissionService},
    state::AppState,
};

/// 路由级访问范围：允许的角色白名单 + 所属权限模块。
/// 通过 `Extension` 挂在路由上，由 [`access_guard`] 读取。
#[derive(Debug, Clone, Copy)]
pub struct AccessScope {
    pub module: &'static str,
    pub roles: &'static [AdminRole],
}

impl AccessScope {
    pub const fn new(module: &'static str, roles: &'static [AdminRole]) -> Self {
        Self { module, roles }
    }
}

/// 基础鉴权中间件（黑名单检查）。已登出的令牌在剩余有效期内被拒绝。
/// 没有令牌时直接放行，由后续的守卫或 Claims 提取器负责强制认证。
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token_str) = token else {
        return Ok(next.run(req).await);
    };

    let mut redis_conn = state.redis.clone();
    let is_blacklisted: bool = redis_conn.exists(blacklist_key(token_str)).await?;

    if is_blacklisted {
        tracing::warn!("🚫 Blocked blacklisted token");
        return Err(AppError::AuthError("Token has been revoked".to_string()));
    }

    Ok(next.run(req).await)
}

/// 访问守卫：校验令牌、角色白名单，sub-admin 另需权限矩阵中对应模块的操作位。
/// HTTP 方法决定所需操作：GET 查看，POST 新增，PUT/PATCH 编辑，DELETE 删除。
pub async fn access_guard(
    State(state): State<AppState>,
    Extension(scope): Extension<AccessScope>,
    claims: Claims,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let role = AdminRole::from_str(&claims.role)
        .map_err(|_| AppError::Forbidden(format!("Unknown role '{}'", claims.role)))?;
    let action = PermissionAction::from_method(req.method());

    let grant = match (role, claims.role_id.as_deref()) {
        (AdminRole::SubAdmin, Some(role_id)) => {
            let role_id = Uuid::parse_str(role_id)
                .map_err(|_| AppError::AuthError("Invalid role binding in token".to_string()))?;
            PermissionService::module_flags(&state.db, role_id, scope.module).await?
        }
        _ => None,
    };

    if let Err(e) = authorize(role, &scope, grant, action) {
        tracing::warn!("🚫 {} denied {} on {}", claims.username, action, scope.module);
        return Err(e);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// 纯判定逻辑：角色在白名单内；super-admin / admin 不受矩阵约束；sub-admin 需要对应操作位。
pub fn authorize(
    role: AdminRole,
    scope: &AccessScope,
    grant: Option<PermissionFlags>,
    action: PermissionAction,
) -> Result<(), AppError> {
    if !scope.roles.contains(&role) {
        return Err(AppError::Forbidden(format!(
            "Role '{}' may not access {}",
            role, scope.module
        )));
    }

    match role {
        AdminRole::SuperAdmin | AdminRole::Admin => Ok(()),
        AdminRole::SubAdmin if grant.is_some_and(|g| g.allows(action)) => Ok(()),
        AdminRole::SubAdmin => Err(AppError::Forbidden(format!(
            "Missing '{}' permission on {}",
            action, scope.module
        ))),
    }
}
