// ==========================================
// Redis Key 前缀定义：这些常量用于构建Redis键的前缀部分，确保键名的一致性和可管理性。
// ==========================================

/// Refresh Token 前缀：用于存储刷新令牌的Redis键前缀。
pub const REDIS_PREFIX_REFRESH: &str = "refresh_token:";

/// 黑名单前缀：用于存储已注销令牌的Redis键前缀。
pub const REDIS_PREFIX_BLACKLIST: &str = "blacklist:token:";

/// 已使用 Token 前缀：用于标记已使用过的刷新令牌，防止重复使用。
pub const REDIS_PREFIX_USED: &str = "USED:";

/// 限流计数前缀
pub const REDIS_PREFIX_RATE_LIMIT: &str = "rate_limit:";

// ==========================================
// 业务逻辑常量
// ==========================================

/// Token 轮换宽限期（秒）：在令牌轮换期间允许旧令牌继续使用的宽限时间。
pub const ROTATION_GRACE_PERIOD: u64 = 10;

/// 列表默认每页条数
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// 允许上传的图片扩展名
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// 单次请求最多上传的图片数量
pub const MAX_UPLOAD_FILES: usize = 10;

/// multipart 请求中文本字段与分隔符的余量
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// 静态托管上传文件的 URL 前缀（同时也是数据库中相对路径的前缀）
pub const UPLOADS_URL_PREFIX: &str = "uploads";

/// 迁移中预置的权限模块名称
pub const MODULE_DASHBOARD: &str = "dashboard";
pub const MODULE_USERS: &str = "users";
pub const MODULE_ROLES: &str = "roles";
pub const MODULE_SETTINGS: &str = "settings";
