pub mod limiter;
pub mod slug;
pub mod storage;

/// 限流宏：在处理器中便捷地执行速率限制检查。
/// 用法: rate_limit!(&state.redis, "action_name", &subject, max_count, window_seconds);
#[macro_export]
macro_rules! rate_limit {
    ($redis:expr, $action:expr, $key:expr, $limit:expr, $window:expr) => {
        if let Err(e) =
            $crate::utils::limiter::check_rate_limit($redis, $action, $key, $limit, $window).await
        {
            return Err(e.into());
        }
    };
}

/// 当前时间，截断到微秒以与 PostgreSQL `timestamptz` 精度一致，
/// 否则回读的 `updated_at` 无法与内存中的值精确比较。
pub fn now() -> sea_orm::prelude::DateTimeWithTimeZone {
    use chrono::SubsecRound;
    chrono::Utc::now().trunc_subsecs(6).fixed_offset()
}
