//! 单元测试共用的内存 SQLite 数据库（表结构直接由实体推导）、配置与应用状态。

use std::path::Path;

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Schema, Set,
};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    core::config::Config,
    entity::{admin_modules, catalog_records, permissions, roles, settings, users},
    state::AppState,
};

pub const SEEDED_MODULES: &[&str] = &[
    "dashboard",
    "users",
    "roles",
    "locations",
    "categories",
    "products",
    "settings",
];

pub fn config(upload_dir: &str) -> Config {
    Config {
        database_url: SecretString::from("sqlite::memory:".to_string()),
        redis_url: SecretString::from("redis://127.0.0.1:1".to_string()),
        jwt_secret: SecretString::from("test-secret".to_string()),
        server_port: 0,
        server_host: "127.0.0.1".into(),
        rust_log: "info".into(),
        jwt_expiration: 3600,
        refresh_token_expiration: 60,
        log_dir: "logs".into(),
        upload_dir: upload_dir.into(),
        max_upload_size: 5 * 1024 * 1024,
        admin_username: None,
        admin_password: None,
    }
}

/// 带内存库的应用状态。Redis 连接是惰性的，只有黑名单与限流会真正发起连接，
/// 测试用的受保护路由不经过这两者。
pub fn app_state(db: DatabaseConnection, upload_dir: &Path) -> AppState {
    let config = config(&upload_dir.to_string_lossy());
    let client = redis::Client::open(config.redis_url.expose_secret()).expect("redis url");
    let redis = ConnectionManager::new_lazy_with_config(
        client,
        ConnectionManagerConfig::new().set_number_of_retries(0),
    )
    .expect("lazy redis manager");
    AppState::new(db, redis, config)
}

pub async fn memory_db() -> DatabaseConnection {
    // 内存库只存在于单个连接中，连接池必须固定为 1
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("sqlite memory db");

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    create_table(&db, &schema, roles::Entity).await;
    create_table(&db, &schema, users::Entity).await;
    create_table(&db, &schema, admin_modules::Entity).await;
    create_table(&db, &schema, permissions::Entity).await;
    create_table(&db, &schema, catalog_records::Entity).await;
    create_table(&db, &schema, settings::Entity).await;

    for name in SEEDED_MODULES {
        admin_modules::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("seed module");
    }

    db
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, schema: &Schema, entity: E) {
    let stmt = schema.create_table_from_entity(entity);
    db.execute(db.get_database_backend().build(&stmt))
        .await
        .expect("create table");
}
