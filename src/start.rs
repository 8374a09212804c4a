// src/start.rs
use std::{net::SocketAddr, time::Duration};

use migration::{Migrator, MigratorTrait};
use redis::aio::ConnectionManager;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use secrecy::ExposeSecret;
use tokio::{net::TcpListener, signal};

use crate::{
    core::{config::Config, log},
    routes,
    services::auth as AuthService,
    state::AppState,
};

/// 应用入口：加载配置 → 日志 → 数据库（含迁移与初始管理员）→ Redis → 上传目录 → HTTP 服务。
/// 启动阶段的任何失败都直接终止进程；服务在收到 SIGINT / SIGTERM 后优雅关闭。
pub async fn run() {
    let config = Config::new();

    // guard 必须持有到进程结束，否则文件日志的尾部会丢失
    let _guard = log::init(&config.rust_log, &config.log_dir);
    tracing::info!("🔍 Config loaded successfully.");

    let db = connect_database(&config).await;
    bootstrap_admin(&config, &db).await;
    let redis = connect_redis(&config).await;

    std::fs::create_dir_all(&config.upload_dir).expect("❌ Failed to create upload directory");
    tracing::info!("📁 Serving uploads from {}", config.upload_dir);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .expect("❌ Invalid address configuration");

    let app = routes::create_router(AppState::new(db, redis, config));
    let listener = TcpListener::bind(addr).await.expect("❌ Failed to bind address");
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("❌ Server error");
}

/// 建立连接池并执行全部待执行迁移（建表 + 预置权限模块）
async fn connect_database(config: &Config) -> DatabaseConnection {
    let mut opt = ConnectOptions::new(config.database_url.expose_secret());
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("❌ Failed to connect to Database");
    tracing::info!("✅ Database connected.");

    Migrator::up(&db, None)
        .await
        .expect("❌ Failed to run migrations");
    tracing::info!("✅ Migrations applied.");

    db
}

/// 配置了 ADMIN_USERNAME / ADMIN_PASSWORD 且 users 表为空时创建超级管理员
async fn bootstrap_admin(config: &Config, db: &DatabaseConnection) {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return;
    };
    match AuthService::bootstrap_super_admin(db, username, password).await {
        Ok(Some(_)) => {}
        Ok(None) => tracing::debug!("Users exist, skipping super-admin bootstrap"),
        Err(e) => panic!("❌ Failed to bootstrap super-admin: {e}"),
    }
}

/// ConnectionManager 自带断线重连，可在处理器间廉价克隆
async fn connect_redis(config: &Config) -> ConnectionManager {
    let client = redis::Client::open(config.redis_url.expose_secret())
        .expect("❌ Invalid Redis URL");
    let manager = client
        .get_connection_manager()
        .await
        .expect("❌ Failed to connect to Redis");
    tracing::info!("✅ Redis connected.");
    manager
}

/// 等待 Ctrl+C 或 SIGTERM（非 Unix 平台只监听 Ctrl+C）
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("🛑 Signal received, starting graceful shutdown...");
}
