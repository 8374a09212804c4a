use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::enums::AdminRole;

/// 创建后台账号（仅 super-admin / admin 可调用）
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(regex(path = *crate::dtos::PHONE_REGEX, message = "Invalid phone format"))]
    pub phone: Option<String>,

    pub role: AdminRole,

    /// sub-admin 需要绑定权限角色
    pub role_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Account cannot be empty"))]
    pub account: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}
