use std::collections::HashMap;

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    core::error::AppError,
    dtos::catalog::CatalogInput,
    services::catalog::CatalogPayload,
    utils::storage::UploadedFile,
};

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// 目录记录载荷：`multipart/form-data`（文本字段 + 文件）或 JSON。
impl<S> FromRequest<S> for CatalogPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(input) = Json::<CatalogInput>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(input.into());
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut fields = HashMap::new();
        let mut files = Vec::new();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                // 空文件名代表浏览器提交了未选择文件的 <input type=file>
                Some(file_name) if !file_name.is_empty() => {
                    let bytes = field.bytes().await?;
                    files.push(UploadedFile { file_name, bytes });
                }
                Some(_) => {
                    field.bytes().await?;
                }
                None => {
                    fields.insert(name, field.text().await?);
                }
            }
        }

        Ok(CatalogPayload {
            input: CatalogInput::from_form_fields(&fields)?,
            files,
        })
    }
}

/// JSON 请求体 + validator 校验
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

impl<S> FromRequest<S> for crate::dtos::role::RoleInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ValidatedJson(input) = ValidatedJson::from_request(req, state).await?;
        Ok(input)
    }
}
