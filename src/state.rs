use sea_orm::DatabaseConnection;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use crate::{core::config::Config, utils::storage::UploadStore};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: ConnectionManager,
    /// 全局配置，使用 Arc 包装以实现廉价克隆
    pub config: Arc<Config>,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: DatabaseConnection, redis: ConnectionManager, config: Config) -> Self {
        let uploads = UploadStore::new(&config.upload_dir, config.max_upload_size);
        Self {
            db,
            redis,
            config: Arc::new(config),
            uploads,
        }
    }
}
