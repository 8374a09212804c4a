use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Extension, Router,
};
use sea_orm::Iterable;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

// 自定义中间件重命名为 app_middleware，避免与 axum::middleware 冲突
use crate::{
    core::{
        constants::{
            MAX_UPLOAD_FILES, MODULE_DASHBOARD, MODULE_ROLES, MODULE_SETTINGS, MODULE_USERS,
            MULTIPART_OVERHEAD, UPLOADS_URL_PREFIX,
        },
        enums::{AdminRole, ResourceKind},
    },
    handlers::{self, resource},
    middleware::{self as app_middleware, auth::AccessScope},
    services::{catalog::CatalogRepository, role::RoleRepository},
    state::AppState,
};

/// 创建应用程序路由器。
///
/// # 路由结构
/// 1. 认证路由 (`/auth/*`)：公开访问，登录、刷新令牌、登出。
/// 2. 受保护路由：见 [`protected_routes`]。
/// 3. 上传文件静态托管 (`/uploads/**`)。
///
/// # 中间件设计
/// 受保护路由的执行顺序：黑名单检查 → 访问守卫 → 处理器。
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        // 刷新处理器内部已完成令牌校验与轮换，无需额外中间件
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout));

    // 基础鉴权：令牌黑名单检查，已注销的令牌在这里被拒绝
    let protected = protected_routes(&state).layer(middleware::from_fn_with_state(
        state.clone(),
        app_middleware::auth::auth_middleware,
    ));

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(|| async { "🚀 Catalog admin is running!" }))
        .nest("/auth", auth_routes)
        .merge(protected)
        .nest_service(&format!("/{}", UPLOADS_URL_PREFIX), uploads)
        // 全局日志与 CORS
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 需要登录的路由（不含黑名单检查）：
/// 1. 用户路由 (`/users/me`)。
/// 2. 管理员路由 (`/admin/register`)：仅 super-admin / admin。
/// 3. 角色、权限矩阵、模块、设置、仪表盘。
/// 4. 每个目录种类一组 CRUD 路由 (`/countries`, `/products`, ...)。
///
/// 访问范围 ([`AccessScope`]) 与资源种类通过 `Extension` 挂在路由上，守卫和提取器从请求扩展中读取。
pub(crate) fn protected_routes(state: &AppState) -> Router<AppState> {
    let user_routes = Router::new()
        .route("/me", get(handlers::users::get_me).post(handlers::users::update_me));

    let admin_routes = guarded(
        Router::new().route("/register", post(handlers::auth::register)),
        state,
        AccessScope::new(MODULE_USERS, AdminRole::MANAGERS),
    );

    let role_routes = guarded(
        Router::new()
            .route(
                "/",
                get(resource::list::<RoleRepository>).post(resource::create::<RoleRepository>),
            )
            .route(
                "/{id}",
                get(resource::get::<RoleRepository>)
                    .put(resource::update::<RoleRepository>)
                    .delete(resource::delete::<RoleRepository>),
            )
            .route("/{id}/status", patch(resource::toggle_status::<RoleRepository>))
            .route(
                "/{id}/permissions",
                get(handlers::permissions::get_matrix).put(handlers::permissions::save_matrix),
            ),
        state,
        AccessScope::new(MODULE_ROLES, AdminRole::ALL),
    );

    let module_routes = guarded(
        Router::new().route("/", get(handlers::permissions::list_modules)),
        state,
        AccessScope::new(MODULE_ROLES, AdminRole::ALL),
    );

    let setting_routes = guarded(
        Router::new().route(
            "/",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        ),
        state,
        AccessScope::new(MODULE_SETTINGS, AdminRole::ALL),
    );

    let dashboard_routes = guarded(
        Router::new().route("/", get(handlers::dashboard::stats)),
        state,
        AccessScope::new(MODULE_DASHBOARD, AdminRole::ALL),
    );

    let mut routes = Router::new()
        .nest("/users", user_routes)
        .nest("/admin", admin_routes)
        .nest("/roles", role_routes)
        .nest("/modules", module_routes)
        .nest("/settings", setting_routes)
        .nest("/dashboard", dashboard_routes);

    for kind in ResourceKind::iter() {
        routes = routes.nest(&format!("/{}", kind.path()), catalog_routes(state, kind));
    }
    routes
}

/// 单个目录种类的 CRUD 路由，种类通过 `Extension` 传给仓储提取器
fn catalog_routes(state: &AppState, kind: ResourceKind) -> Router<AppState> {
    let routes = Router::new()
        .route(
            "/",
            get(resource::list::<CatalogRepository>).post(resource::create::<CatalogRepository>),
        )
        .route(
            "/{id}",
            get(resource::get::<CatalogRepository>)
                .put(resource::update::<CatalogRepository>)
                .delete(resource::delete::<CatalogRepository>),
        )
        .route("/{id}/status", patch(resource::toggle_status::<CatalogRepository>));

    // 上传请求的上限：单文件上限 × 最大文件数 + 文本字段余量（axum 默认只有 2 MiB）
    let body_limit = state
        .config
        .max_upload_size
        .saturating_mul(MAX_UPLOAD_FILES)
        .saturating_add(MULTIPART_OVERHEAD);

    guarded(routes, state, AccessScope::new(kind.module(), AdminRole::ALL))
        .layer(Extension(kind))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// 中间件链（执行顺序从下往上）：
/// 2. (外层) 注入访问范围
/// 1. (内层) 访问守卫：角色白名单 + sub-admin 权限矩阵
fn guarded(routes: Router<AppState>, state: &AppState, scope: AccessScope) -> Router<AppState> {
    routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth::access_guard,
        ))
        .layer(Extension(scope))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use reqwest::{
        multipart::{Form, Part},
        StatusCode,
    };
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    use super::*;
    use crate::{
        client::{AdminClient, ClientError, PermissionEditor},
        core::enums::PermissionAction,
        dtos::{
            catalog::CatalogRecordDto,
            permission::{PermissionFlags, PermissionInput, SavePermissionsRequest},
            role::{RoleDto, RoleInput},
        },
        entity::users,
        services::{auth::generate_access_token, permission as PermissionService, Repository},
        test_support::{app_state, memory_db, SEEDED_MODULES},
        utils::now,
    };

    struct TestServer {
        base_url: String,
        state: AppState,
        uploads: tempfile::TempDir,
    }

    /// 在随机端口上运行受保护路由
    async fn serve() -> TestServer {
        let uploads = tempfile::tempdir().unwrap();
        let state = app_state(memory_db().await, uploads.path());
        let app = protected_routes(&state).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        TestServer { base_url: format!("http://{}", addr), state, uploads }
    }

    impl TestServer {
        fn client(&self, role: AdminRole, role_id: Option<Uuid>) -> AdminClient {
            let ts = now();
            let user = users::Model {
                id: Uuid::new_v4(),
                username: format!("{}-user", role),
                password_hash: String::new(),
                phone: None,
                role,
                role_id,
                is_active: true,
                created_at: ts,
                updated_at: ts,
            };
            let token = generate_access_token(&self.state.config, &user).unwrap();
            AdminClient::new(self.base_url.as_str()).unwrap().with_token(token)
        }

        async fn role(&self, name: &str) -> RoleDto {
            RoleRepository::new(self.state.db.clone())
                .create(RoleInput { name: Some(name.to_string()), ..Default::default() })
                .await
                .unwrap()
        }

        fn stored(&self, path: &str) -> bool {
            stored_under(self.uploads.path(), path)
        }
    }

    fn stored_under(root: &Path, path: &str) -> bool {
        root.join(path.trim_start_matches("uploads/")).exists()
    }

    #[tokio::test]
    async fn permission_matrix_saves_and_reloads_over_http() {
        let server = serve().await;
        let role = server.role("Catalog Manager").await;
        let admin = server.client(AdminRole::Admin, None);

        let mut editor = PermissionEditor::new(admin.clone(), role.id);
        editor.load().await.unwrap();
        assert_eq!(editor.grid().rows().len(), SEEDED_MODULES.len());

        let module = |name: &str| {
            editor.grid().rows().iter().find(|r| r.module == name).unwrap().module_id
        };
        let (products, dashboard) = (module("products"), module("dashboard"));
        editor.grid_mut().toggle_all(products);
        editor.grid_mut().toggle(dashboard, PermissionAction::View);
        editor.save().await.unwrap();
        assert!(!editor.grid().is_dirty());

        let fetched = admin.fetch_permissions(role.id).await.unwrap();
        let flags = |id: i32| fetched.permissions.iter().find(|r| r.module_id == id).unwrap().flags;
        assert_eq!(flags(products), PermissionFlags::full());
        assert_eq!(flags(dashboard), PermissionFlags::new(true, false, false, false));
        assert!(fetched.updated_at > role.updated_at);

        // 以加载时的 updated_at 再保存一次：已被上面的保存覆盖
        let stale = SavePermissionsRequest {
            permissions: vec![],
            expected_updated_at: Some(role.updated_at),
        };
        let err = admin.save_permissions(role.id, &stale).await.unwrap_err();
        assert!(matches!(err, ClientError::Conflict(_)));
        let unchanged = admin.fetch_permissions(role.id).await.unwrap();
        assert_eq!(unchanged.permissions, fetched.permissions);
    }

    #[tokio::test]
    async fn sub_admin_is_limited_by_the_matrix() {
        let server = serve().await;
        let db = &server.state.db;
        let role = server.role("Location Viewer").await;
        let locations = PermissionService::list_modules(db)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.name == "locations")
            .unwrap()
            .id;
        let view_only = PermissionInput {
            module_id: locations,
            flags: PermissionFlags::new(true, false, false, false),
        };
        let request =
            SavePermissionsRequest { permissions: vec![view_only], expected_updated_at: None };
        PermissionService::save_matrix(db, role.id, request).await.unwrap();

        let admin = server.client(AdminRole::Admin, None);
        let india: CatalogRecordDto =
            admin.create(ResourceKind::Country, &json!({ "name": "India" })).await.unwrap();

        let viewer = server.client(AdminRole::SubAdmin, Some(role.id));
        let (rows, _) = viewer
            .list::<CatalogRecordDto>(ResourceKind::Country, 1, 10, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let err = viewer.delete(ResourceKind::Country, india.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Forbidden(_)));

        let response = reqwest::Client::new()
            .delete(format!("{}/countries/{}", server.base_url, india.id))
            .bearer_auth(viewer.token().unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], 403);

        let products = viewer.list::<CatalogRecordDto>(ResourceKind::Product, 1, 10, None).await;
        assert!(matches!(products, Err(ClientError::Forbidden(_))));
        let roles = viewer.fetch_permissions(role.id).await;
        assert!(matches!(roles, Err(ClientError::Forbidden(_))));

        admin.delete(ResourceKind::Country, india.id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let server = serve().await;
        let anonymous = AdminClient::new(server.base_url.as_str()).unwrap();
        let result = anonymous.list::<CatalogRecordDto>(ResourceKind::Faq, 1, 10, None).await;
        assert!(matches!(result, Err(ClientError::Unauthorized)));
    }

    #[tokio::test]
    async fn multipart_upload_creates_and_reconciles_images() {
        let server = serve().await;
        let admin = server.client(AdminRole::SuperAdmin, None);
        let shoes: CatalogRecordDto =
            admin.create(ResourceKind::Category, &json!({ "name": "Shoes" })).await.unwrap();

        // 请求体超过 axum 默认的 2 MiB
        let form = Form::new()
            .text("name", "Runner")
            .text("parentId", shoes.id.to_string())
            .part("images", Part::bytes(vec![7u8; 3 * 1024 * 1024]).file_name("a.jpg"))
            .part("images", Part::bytes(b"png".to_vec()).file_name("b.png"));
        let created: CatalogRecordDto =
            admin.create_with_images(ResourceKind::Product, form).await.unwrap();
        assert_eq!(created.parent_id, Some(shoes.id));
        assert_eq!(created.images.len(), 2);
        assert!(created.images.iter().all(|p| server.stored(p)));

        let keep = serde_json::to_string(&[&created.images[1]]).unwrap();
        let form = Form::new()
            .text("existingImages", keep)
            .part("images", Part::bytes(b"webp".to_vec()).file_name("c.webp"));
        let updated: CatalogRecordDto =
            admin.update_with_images(ResourceKind::Product, created.id, form).await.unwrap();

        assert_eq!(updated.images.len(), 2);
        assert_eq!(updated.images[0], created.images[1]);
        assert!(updated.images[1].ends_with(".webp"));
        assert!(server.stored(&updated.images[1]));
        assert!(!server.stored(&created.images[0]));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_by_the_store() {
        let server = serve().await;
        let admin = server.client(AdminRole::Admin, None);
        let limit = server.state.config.max_upload_size;

        let form = Form::new()
            .text("name", "Huge")
            .part("images", Part::bytes(vec![0u8; limit + 1]).file_name("big.jpg"));
        let result =
            admin.create_with_images::<CatalogRecordDto>(ResourceKind::Service, form).await;
        assert!(matches!(result, Err(ClientError::BadRequest(ref m)) if m.contains("too large")));
    }

    #[tokio::test]
    async fn list_envelope_carries_pagination() {
        let server = serve().await;
        let admin = server.client(AdminRole::Admin, None);
        for name in ["Alpha", "Beta", "Gamma"] {
            admin
                .create::<CatalogRecordDto, _>(ResourceKind::Faq, &json!({ "name": name }))
                .await
                .unwrap();
        }

        let (rows, pagination) =
            admin.list::<CatalogRecordDto>(ResourceKind::Faq, 2, 2, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((pagination.total, pagination.total_pages), (3, 2));

        let body: Value = reqwest::Client::new()
            .get(format!("{}/faqs?page=1&limit=2&search=alp", server.base_url))
            .bearer_auth(admin.token().unwrap())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["code"], 200);
        assert_eq!(body["pagination"]["totalPages"], 1);
        assert_eq!(body["data"][0]["name"], "Alpha");

        let huge = admin.list::<CatalogRecordDto>(ResourceKind::Faq, u64::MAX, 10, None).await;
        assert!(matches!(huge, Err(ClientError::BadRequest(_))));
    }
}
