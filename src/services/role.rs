// src/services/role.rs
use async_trait::async_trait;
use sea_orm::{
    prelude::{DateTimeWithTimeZone, Expr},
    sea_query::{Func, Order},
    *,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::{enums::SortOrder, error::AppError},
    dtos::{catalog::ListQuery, response::Pagination, role::{RoleDto, RoleInput}},
    entity::{permissions, roles, users},
    services::{check_precondition, contains_ignore_case, map_write_error, Repository},
    utils::now,
};

/// 权限角色仓储
#[derive(Clone)]
pub struct RoleRepository {
    db: DatabaseConnection,
}

impl RoleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find(&self, id: Uuid) -> Result<roles::Model, AppError> {
        roles::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    async fn ensure_unique_name(&self, name: &str, exclude: Option<Uuid>) -> Result<(), AppError> {
        let lowered = Expr::expr(Func::lower(Expr::col(roles::Column::Name)));
        let mut query = roles::Entity::find().filter(lowered.eq(name.to_lowercase()));
        if let Some(id) = exclude {
            query = query.filter(roles::Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            return Err(AppError::BadRequest(format!("Role '{}' already exists", name)));
        }
        Ok(())
    }

    /// 给出 `expected` 时只在 `updated_at` 未变的前提下更新
    async fn write(
        &self,
        active: roles::ActiveModel,
        expected: Option<DateTimeWithTimeZone>,
    ) -> Result<roles::Model, DbErr> {
        let mut update = roles::Entity::update(active);
        if let Some(expected) = expected {
            update = update.filter(roles::Column::UpdatedAt.eq(expected));
        }
        update.exec(&self.db).await
    }
}

#[async_trait]
impl Repository for RoleRepository {
    type Record = RoleDto;
    type Input = RoleInput;

    async fn list(&self, query: &ListQuery) -> Result<(Vec<RoleDto>, Pagination), AppError> {
        query.validate()?;

        let mut select = roles::Entity::find();
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(contains_ignore_case(roles::Column::Name, search));
        }
        if let Some(status) = query.status {
            select = select.filter(roles::Column::Status.eq(status));
        }

        let column = match query.sort_by.as_deref() {
            None | Some("created_at" | "createdAt") => roles::Column::CreatedAt,
            Some("updated_at" | "updatedAt") => roles::Column::UpdatedAt,
            Some("name") => roles::Column::Name,
            Some("status") => roles::Column::Status,
            Some(other) => return Err(AppError::BadRequest(format!("Cannot sort by '{}'", other))),
        };
        let order = match query.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        let paginator = select
            .order_by(column, order)
            .order_by(roles::Column::Id, Order::Asc)
            .paginate(&self.db, query.limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(query.page - 1).await?;

        Ok((
            rows.into_iter().map(RoleDto::from).collect(),
            Pagination::new(query.page, query.limit, total),
        ))
    }

    async fn get(&self, id: Uuid) -> Result<RoleDto, AppError> {
        Ok(self.find(id).await?.into())
    }

    async fn create(&self, input: RoleInput) -> Result<RoleDto, AppError> {
        input.validate()?;
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?
            .to_string();
        self.ensure_unique_name(&name, None).await?;

        let timestamp = now();
        let role = roles::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            status: Set(input.status.unwrap_or(true)),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await
        .map_err(|e| map_write_error(e, format!("Role '{}' already exists", name)))?;

        tracing::info!("✨ Created role {} ({})", role.name, role.id);
        Ok(role.into())
    }

    async fn update(&self, id: Uuid, input: RoleInput) -> Result<RoleDto, AppError> {
        input.validate()?;
        let role = self.find(id).await?;
        check_precondition(input.expected_updated_at, role.updated_at)?;

        let mut active: roles::ActiveModel = role.clone().into();
        if let Some(name) = input.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if name != role.name {
                self.ensure_unique_name(name, Some(id)).await?;
            }
            active.name = Set(name.to_string());
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        active.updated_at = Set(now());

        let updated = self
            .write(active, input.expected_updated_at)
            .await
            .map_err(|e| map_write_error(e, "Role name already exists"))?;
        Ok(updated.into())
    }

    /// 删除角色：同时删除其权限记录，并解除用户绑定。
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.find(id).await?;

        let txn = self.db.begin().await?;
        permissions::Entity::delete_many()
            .filter(permissions::Column::RoleId.eq(id))
            .exec(&txn)
            .await?;
        users::Entity::update_many()
            .col_expr(users::Column::RoleId, Expr::value(Option::<Uuid>::None))
            .filter(users::Column::RoleId.eq(id))
            .exec(&txn)
            .await?;
        roles::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!("🗑️ Deleted role {}", id);
        Ok(())
    }

    async fn toggle_status(&self, id: Uuid) -> Result<RoleDto, AppError> {
        let role = self.find(id).await?;
        let status = !role.status;

        let mut active: roles::ActiveModel = role.into();
        active.status = Set(status);
        active.updated_at = Set(now());
        Ok(active.update(&self.db).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_db;

    fn named(name: &str) -> RoleInput {
        RoleInput { name: Some(name.to_string()), ..Default::default() }
    }

    #[tokio::test]
    async fn role_names_are_unique_case_insensitively() {
        let repo = RoleRepository::new(memory_db().await);
        repo.create(named("Editor")).await.unwrap();
        assert!(matches!(repo.create(named("editor")).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn toggle_and_rename() {
        let repo = RoleRepository::new(memory_db().await);
        let role = repo.create(named("Editor")).await.unwrap();

        let toggled = repo.toggle_status(role.id).await.unwrap();
        assert!(!toggled.status);
        assert!(repo.toggle_status(role.id).await.unwrap().status);

        let renamed = repo.update(role.id, named("Content Editor")).await.unwrap();
        assert_eq!(renamed.name, "Content Editor");

        let query = ListQuery { search: Some("content".into()), ..Default::default() };
        let (rows, pagination) = repo.list(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(pagination.total_pages, 1);
    }

    #[tokio::test]
    async fn search_matches_wildcards_literally() {
        let repo = RoleRepository::new(memory_db().await);
        repo.create(named("100% access")).await.unwrap();
        repo.create(named("1000 viewers")).await.unwrap();
        repo.create(named("read_only")).await.unwrap();
        repo.create(named("readXonly")).await.unwrap();

        let search = |s: &str| ListQuery { search: Some(s.into()), ..Default::default() };
        let (rows, _) = repo.list(&search("100%")).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), ["100% access"]);
        let (rows, _) = repo.list(&search("d_o")).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), ["read_only"]);
    }

    #[tokio::test]
    async fn concurrent_rename_with_same_timestamp_conflicts() {
        let repo = RoleRepository::new(memory_db().await);
        let role = repo.create(named("Editor")).await.unwrap();
        let loaded = roles::Entity::find_by_id(role.id).one(&repo.db).await.unwrap().unwrap();

        let first = RoleInput {
            name: Some("Writer".into()),
            expected_updated_at: Some(role.updated_at),
            ..Default::default()
        };
        repo.update(role.id, first).await.unwrap();

        // 第二个请求在第一个写入前已通过前置检查
        let mut second: roles::ActiveModel = loaded.into();
        second.name = Set("Reviewer".into());
        second.updated_at = Set(now());
        let err = repo.write(second, Some(role.updated_at)).await.unwrap_err();
        assert!(matches!(map_write_error(err, "unused"), AppError::Conflict(_)));
        assert_eq!(repo.get(role.id).await.unwrap().name, "Writer");

        let stale = RoleInput {
            status: Some(false),
            expected_updated_at: Some(role.updated_at),
            ..Default::default()
        };
        assert!(matches!(repo.update(role.id, stale).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn huge_page_is_rejected() {
        let repo = RoleRepository::new(memory_db().await);
        let query = ListQuery { page: u64::MAX, ..Default::default() };
        assert!(matches!(repo.list(&query).await, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn delete_missing_role_is_not_found() {
        let repo = RoleRepository::new(memory_db().await);
        let role = repo.create(named("Temp")).await.unwrap();
        repo.delete(role.id).await.unwrap();
        assert!(matches!(repo.delete(role.id).await, Err(AppError::NotFound(_))));
    }
}
