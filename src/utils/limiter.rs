use std::sync::LazyLock;

use redis::{aio::ConnectionManager, Script};

use crate::core::{constants::REDIS_PREFIX_RATE_LIMIT, error::AppError};

/// 固定窗口计数：原子自增，窗口内首次计数时设置过期时间
static FIXED_WINDOW: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        local count = redis.call("INCR", KEYS[1])
        if count == 1 then
            redis.call("EXPIRE", KEYS[1], ARGV[1])
        end
        return count
    "#,
    )
});

fn rate_limit_key(action: &str, subject: &str) -> String {
    format!("{}{}:{}", REDIS_PREFIX_RATE_LIMIT, action, subject)
}

/// 同一 `(action, subject)` 在 `window` 秒内最多 `limit` 次，超出返回 429
pub async fn check_rate_limit(
    redis: &ConnectionManager,
    action: &str,
    subject: &str,
    limit: usize,
    window: u64,
) -> Result<(), AppError> {
    let mut conn = redis.clone();
    let count: usize = FIXED_WINDOW
        .key(rate_limit_key(action, subject))
        .arg(window)
        .invoke_async(&mut conn)
        .await?;

    if count > limit {
        tracing::warn!("⛔ Rate limit exceeded: {} on {} ({}/{})", subject, action, count, limit);
        return Err(AppError::RateLimitExceeded(format!(
            "Rate limit exceeded. Try again in {} seconds.",
            window
        )));
    }
    Ok(())
}
