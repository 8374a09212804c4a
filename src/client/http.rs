use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart::Form, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::{
    client::{editor::PermissionSource, ClientError, ClientResult},
    core::enums::ResourceKind,
    dtos::{
        auth::{LoginRequest, LoginResponse},
        permission::{PermissionMatrix, SavePermissionsRequest},
        response::{ApiResponse, Pagination},
    },
};

/// 后台 API 客户端。登录后持有访问令牌，登出时清除。
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// 复用已有的访问令牌（例如上次会话保存的令牌）
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ClientResult<ApiResponse<T>> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(error_for(status, &text));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        self.send::<T>(request)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing data".to_string()))
    }

    // ========== Auth API ==========

    /// 使用用户名或手机号登录，成功后保存访问令牌
    pub async fn login(&mut self, account: &str, password: &str) -> ClientResult<LoginResponse> {
        let body = LoginRequest {
            account: account.to_string(),
            password: password.to_string(),
        };
        let request = self.client.post(self.url("auth/login")).json(&body);
        let tokens: LoginResponse = self.data(request).await?;
        self.token = Some(tokens.access_token.clone());
        Ok(tokens)
    }

    /// 登出。无论服务端是否成功，本地会话都会被清除。
    pub async fn logout(&mut self) -> ClientResult<()> {
        let result = self
            .send::<serde_json::Value>(self.client.post(self.url("auth/logout")))
            .await
            .map(|_| ());
        self.token = None;
        result
    }

    // ========== Permission API ==========

    pub async fn fetch_permissions(&self, role_id: Uuid) -> ClientResult<PermissionMatrix> {
        self.data(self.client.get(self.url(&format!("roles/{}/permissions", role_id))))
            .await
    }

    pub async fn save_permissions(
        &self,
        role_id: Uuid,
        request: &SavePermissionsRequest,
    ) -> ClientResult<PermissionMatrix> {
        self.data(
            self.client
                .put(self.url(&format!("roles/{}/permissions", role_id)))
                .json(request),
        )
        .await
    }

    // ========== Catalog API ==========

    /// 分页列表。`search` 为名称的不区分大小写子串匹配。
    pub async fn list<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        page: u64,
        limit: u64,
        search: Option<&str>,
    ) -> ClientResult<(Vec<T>, Pagination)> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }

        let response = self
            .send::<Vec<T>>(self.client.get(self.url(kind.path())).query(&query))
            .await?;
        match (response.data, response.pagination) {
            (Some(rows), Some(pagination)) => Ok((rows, pagination)),
            _ => Err(ClientError::InvalidResponse("Missing page data".to_string())),
        }
    }

    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        kind: ResourceKind,
        body: &B,
    ) -> ClientResult<T> {
        self.data(self.client.post(self.url(kind.path())).json(body)).await
    }

    /// 以 multipart 新建：文本字段 + `images` 文件字段
    pub async fn create_with_images<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        form: Form,
    ) -> ClientResult<T> {
        self.data(self.client.post(self.url(kind.path())).multipart(form)).await
    }

    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        kind: ResourceKind,
        id: Uuid,
        body: &B,
    ) -> ClientResult<T> {
        self.data(self.client.put(self.url(&format!("{}/{}", kind.path(), id))).json(body))
            .await
    }

    /// 以 multipart 编辑。`existingImages` 字段（JSON 数组）决定保留哪些旧图片。
    pub async fn update_with_images<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        id: Uuid,
        form: Form,
    ) -> ClientResult<T> {
        let url = self.url(&format!("{}/{}", kind.path(), id));
        self.data(self.client.put(url).multipart(form)).await
    }

    pub async fn toggle_status<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> ClientResult<T> {
        self.data(self.client.patch(self.url(&format!("{}/{}/status", kind.path(), id))))
            .await
    }

    pub async fn delete(&self, kind: ResourceKind, id: Uuid) -> ClientResult<()> {
        let url = self.url(&format!("{}/{}", kind.path(), id));
        self.send::<serde_json::Value>(self.client.delete(url))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PermissionSource for AdminClient {
    async fn fetch(&self, role_id: Uuid) -> ClientResult<PermissionMatrix> {
        self.fetch_permissions(role_id).await
    }

    async fn save(
        &self,
        role_id: Uuid,
        request: &SavePermissionsRequest,
    ) -> ClientResult<PermissionMatrix> {
        self.save_permissions(role_id, request).await
    }
}

/// 服务端错误统一为 `{ code, msg }` 信封；无法解析时退回原始文本
fn error_for(status: StatusCode, body: &str) -> ClientError {
    let msg = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .map(|envelope| envelope.msg)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::FORBIDDEN => ClientError::Forbidden(msg),
        StatusCode::NOT_FOUND => ClientError::NotFound(msg),
        StatusCode::CONFLICT => ClientError::Conflict(msg),
        s if s.is_client_error() => ClientError::BadRequest(msg),
        _ => ClientError::Server(msg),
    }
}
