// src/core/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;
use crate::dtos::response::ApiResponse;

/// 应用程序统一错误类型。覆盖数据库、缓存、文件存储、验证、认证、授权等各个层面的错误。
///
/// 通过实现 `IntoResponse` trait，任何 `AppError` 都可以直接转换为HTTP响应，
/// 确保错误信息以统一的格式返回给客户端。
#[derive(Error, Debug)]
pub enum AppError {
    /// 数据库相关错误。包装 SeaORM 的 `DbErr`，自动转换。
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// Redis相关错误。
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// 上传文件读写错误。
    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    /// 输入验证错误。包装 validator crate 的 `ValidationErrors`，自动转换。
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// 多部分表单解析失败。返回400。
    #[error("Invalid form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),

    /// 业务层面的请求错误，如 slug 重复、父级不存在等。返回400 Bad Request。
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 认证错误。如令牌无效、用户名密码错误等。返回401 Unauthorized。
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// 授权错误。如角色不在白名单、缺少模块权限等。返回403 Forbidden。
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// 资源未找到错误。返回404 Not Found。
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 资源冲突错误。如更新前置条件不满足、仍有子记录引用等。返回409 Conflict。
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 请求频率限制错误。返回429 Too Many Requests。
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// 服务器内部错误。用于未预期的错误情况。返回500 Internal Server Error。
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_)
            | AppError::RedisError(_)
            | AppError::StorageError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_)
            | AppError::MultipartError(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

/// 将 `AppError` 转换为HTTP响应。
///
/// 对于内部错误（数据库、Redis、文件存储），只返回通用的错误消息并记录详细日志，避免泄露敏感信息。
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let msg = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!("❌ Database Error: {}", e);
                "Database service error".to_string()
            }
            AppError::RedisError(e) => {
                tracing::error!("❌ Redis Error: {}", e);
                "Cache service error".to_string()
            }
            AppError::StorageError(e) => {
                tracing::error!("❌ Storage Error: {}", e);
                "File storage error".to_string()
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("❌ Internal Error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::ValidationError(e) => e.to_string(),
            AppError::MultipartError(e) => e.body_text(),
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::RateLimitExceeded(msg) => msg.clone(),
        };

        ApiResponse::<()>::with_error(status, &msg).into_response()
    }
}
