use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    prelude::Expr,
    sea_query::{Func, LikeExpr, SimpleExpr},
    ColumnTrait, DbErr, SqlErr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::{catalog::ListQuery, response::Pagination},
};

pub mod auth;
pub mod catalog;
pub mod permission;
pub mod role;
pub mod setting;
pub mod user;

/// 通用资源仓储：所有“列表 / 新建 / 编辑 / 删除 / 切换状态”的资源都实现这一接口，
/// 处理器与路由只面向该 trait 编写一次。
#[async_trait]
pub trait Repository: Send + Sync {
    /// 对外返回的记录
    type Record: Serialize + Send;
    /// 新建 / 编辑时的载荷
    type Input: Send;

    async fn list(&self, query: &ListQuery) -> Result<(Vec<Self::Record>, Pagination), AppError>;
    async fn get(&self, id: Uuid) -> Result<Self::Record, AppError>;
    async fn create(&self, input: Self::Input) -> Result<Self::Record, AppError>;
    async fn update(&self, id: Uuid, input: Self::Input) -> Result<Self::Record, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn toggle_status(&self, id: Uuid) -> Result<Self::Record, AppError>;
}

/// 写入错误映射：唯一约束冲突为 400；带前置条件的更新未命中任何行为 409；
/// 其余数据库错误原样上抛。
pub(crate) fn map_write_error(err: DbErr, msg: impl Into<String>) -> AppError {
    if matches!(err, DbErr::RecordNotUpdated) {
        return AppError::Conflict("Record was modified concurrently; reload and retry".to_string());
    }
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::BadRequest(msg.into()),
        _ => AppError::DatabaseError(err),
    }
}

/// 列上的大小写不敏感子串匹配，`%` `_` `\` 按字面处理
pub(crate) fn contains_ignore_case<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 乐观锁前置条件：提供了期望时间戳且与当前值不一致时返回 409。
pub(crate) fn check_precondition(
    expected: Option<DateTime<FixedOffset>>,
    current: DateTime<FixedOffset>,
) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict(format!(
            "Record was modified at {}; reload and retry",
            current.to_rfc3339()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_only_applies_when_present() {
        let now = crate::utils::now();
        assert!(check_precondition(None, now).is_ok());
        assert!(check_precondition(Some(now), now).is_ok());
        let earlier = now - chrono::Duration::seconds(5);
        assert!(matches!(check_precondition(Some(earlier), now), Err(AppError::Conflict(_))));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[test]
    fn unmatched_conditional_update_is_conflict() {
        assert!(matches!(map_write_error(DbErr::RecordNotUpdated, "dup"), AppError::Conflict(_)));
    }
}
