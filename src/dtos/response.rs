use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// 统一响应信封：`{ code, msg, data?, pagination? }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// 分页信息。`total_pages = ceil(total / limit)`，对外使用 camelCase。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self { page, limit, total, total_pages }
    }
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn with_data(data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            msg: "success".to_string(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn with_page(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::with_data(data)
        }
    }

    pub fn with_code(code: StatusCode, msg: &str, data: Option<T>) -> Self {
        Self {
            code: code.as_u16(),
            msg: msg.to_string(),
            data,
            pagination: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn with_message(msg: &str) -> Self {
        Self::with_code(StatusCode::OK, msg, None)
    }

    pub fn with_error(code: StatusCode, msg: &str) -> Self {
        Self::with_code(code, msg, None)
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
