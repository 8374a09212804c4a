use config::{
    builder::DefaultState, Config as ConfigLoader, ConfigBuilder, ConfigError, Environment,
};
use dotenvy::dotenv;
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Postgres 连接串（敏感信息）
    #[serde(alias = "DATABASE_URL")]
    pub database_url: SecretString,

    /// Redis 连接串（敏感信息）
    #[serde(alias = "REDIS_URL")]
    pub redis_url: SecretString,

    /// JWT 签名密钥（敏感信息）
    #[serde(alias = "JWT_SECRET")]
    pub jwt_secret: SecretString,

    #[serde(default = "default_port", alias = "SERVER_PORT")]
    pub server_port: u16,

    #[serde(default = "default_host", alias = "SERVER_HOST")]
    pub server_host: String,

    #[serde(default = "default_log", alias = "RUST_LOG")]
    pub rust_log: String,

    #[serde(default = "default_jwt_exp", alias = "JWT_EXPIRATION")]
    pub jwt_expiration: i64,

    #[serde(default = "default_refresh_exp", alias = "REFRESH_TOKEN_EXPIRATION")]
    pub refresh_token_expiration: i64,

    /// 日志文件目录（按天滚动）
    #[serde(default = "default_log_dir", alias = "LOG_DIR")]
    pub log_dir: String,

    /// 上传文件根目录，对外以 `/uploads` 静态托管
    #[serde(default = "default_upload_dir", alias = "UPLOAD_DIR")]
    pub upload_dir: String,

    /// 单个上传文件的最大字节数
    #[serde(default = "default_max_upload", alias = "MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,

    /// 初始超级管理员，仅在 users 表为空时创建
    #[serde(default, alias = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    #[serde(default, alias = "ADMIN_PASSWORD")]
    pub admin_password: Option<SecretString>,
}

impl Config {
    /// 加载配置（`.env` + 环境变量）。配置错误在启动阶段直接终止进程。
    pub fn new() -> Self {
        dotenv().ok();

        Self::load(ConfigLoader::builder().add_source(Environment::default().try_parsing(true)))
            .unwrap_or_else(|e| panic!("❌ Failed to load configuration: {e}"))
    }

    /// 从任意配置源构建并校验。`try_parsing(true)` 会把 "3000" 解析为数字。
    pub fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_expiration <= 0 || self.refresh_token_expiration <= 0 {
            return Err(ConfigError::Message("token lifetimes must be positive".into()));
        }
        if self.max_upload_size == 0 {
            return Err(ConfigError::Message("MAX_UPLOAD_SIZE must be positive".into()));
        }
        if self.admin_username.is_some() != self.admin_password.is_some() {
            return Err(ConfigError::Message(
                "ADMIN_USERNAME and ADMIN_PASSWORD must be set together".into(),
            ));
        }
        Ok(())
    }
}

// --- 默认值函数 ---
fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_log() -> String {
    "info".to_string()
}
fn default_jwt_exp() -> i64 {
    3600
} // 1 hour
fn default_refresh_exp() -> i64 {
    86400 * 7
} // 7 days
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_upload_dir() -> String {
    "uploads".to_string()
}
fn default_max_upload() -> usize {
    5 * 1024 * 1024
} // 5 MiB

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ConfigBuilder<DefaultState> {
        ConfigLoader::builder()
            .set_override("database_url", "postgres://localhost/catalog").unwrap()
            .set_override("redis_url", "redis://localhost").unwrap()
            .set_override("jwt_secret", "secret").unwrap()
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config = Config::load(base()).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.upload_dir, "uploads");
        assert_eq!(config.max_upload_size, 5 * 1024 * 1024);
        assert_eq!(config.refresh_token_expiration, 604800);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let builder = ConfigLoader::builder().set_override("database_url", "postgres://x").unwrap();
        assert!(Config::load(builder).is_err());
    }

    #[test]
    fn non_positive_lifetimes_are_rejected() {
        let builder = base().set_override("jwt_expiration", 0).unwrap();
        assert!(matches!(Config::load(builder), Err(ConfigError::Message(_))));
    }

    #[test]
    fn bootstrap_admin_needs_both_credentials() {
        let config = Config::load(base()).unwrap();
        assert!(config.admin_username.is_none() && config.admin_password.is_none());

        let half = base().set_override("admin_username", "root").unwrap();
        assert!(matches!(Config::load(half), Err(ConfigError::Message(_))));

        let both = base()
            .set_override("admin_username", "root").unwrap()
            .set_override("admin_password", "change-me").unwrap();
        let config = Config::load(both).unwrap();
        assert_eq!(config.admin_username.as_deref(), Some("root"));
    }
}
