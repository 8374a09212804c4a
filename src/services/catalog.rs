// src/services/catalog.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::{prelude::DateTimeWithTimeZone, sea_query::Order, *};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::{
        constants::MAX_UPLOAD_FILES,
        enums::{ImagePolicy, ResourceKind, SortOrder},
        error::AppError,
    },
    dtos::{
        catalog::{CatalogInput, CatalogRecordDto, KindStats, ListQuery},
        response::Pagination,
    },
    entity::catalog_records::{self, Column, Entity as CatalogRecords},
    services::{check_precondition, contains_ignore_case, map_write_error, Repository},
    utils::{
        now,
        slug::slugify,
        storage::{reconcile_images, UploadStore, UploadedFile},
    },
};

/// 新建 / 编辑目录记录的完整载荷：文本字段 + 上传文件
#[derive(Debug, Clone, Default)]
pub struct CatalogPayload {
    pub input: CatalogInput,
    pub files: Vec<UploadedFile>,
}

impl From<CatalogInput> for CatalogPayload {
    fn from(input: CatalogInput) -> Self {
        Self { input, files: Vec::new() }
    }
}

/// 所有目录资源共用的仓储，按 `ResourceKind` 参数化。
#[derive(Clone)]
pub struct CatalogRepository {
    db: DatabaseConnection,
    uploads: UploadStore,
    kind: ResourceKind,
}

impl CatalogRepository {
    pub fn new(db: DatabaseConnection, uploads: UploadStore, kind: ResourceKind) -> Self {
        Self { db, uploads, kind }
    }

    /// 按 id 查找，种类不符同样视为不存在
    async fn find(&self, id: Uuid) -> Result<catalog_records::Model, AppError> {
        CatalogRecords::find_by_id(id)
            .filter(Column::Kind.eq(self.kind))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", self.kind, id)))
    }

    fn sort_column(&self, field: Option<&str>) -> Result<Column, AppError> {
        match field.map(str::trim).filter(|f| !f.is_empty()) {
            None | Some("created_at" | "createdAt") => Ok(Column::CreatedAt),
            Some("updated_at" | "updatedAt") => Ok(Column::UpdatedAt),
            Some("name" | "title") => Ok(Column::Name),
            Some("slug") => Ok(Column::Slug),
            Some("status") => Ok(Column::Status),
            Some(other) => Err(AppError::BadRequest(format!("Cannot sort by '{}'", other))),
        }
    }

    /// 显式给出的 slug 规范化；否则由名称生成。
    /// 名称中没有任何 ASCII 字母或数字时（如 "भारत"），退回 `<path>-<8 位随机串>`。
    fn resolve_slug(&self, explicit: Option<&str>, name: &str) -> Result<String, AppError> {
        if let Some(explicit) = explicit {
            let slug = slugify(explicit);
            if slug.is_empty() {
                return Err(AppError::BadRequest(
                    "slug must contain letters or digits".to_string(),
                ));
            }
            return Ok(slug);
        }

        let slug = slugify(name);
        if slug.is_empty() {
            let suffix = Uuid::new_v4().simple().to_string();
            return Ok(format!("{}-{}", self.kind.path(), &suffix[..8]));
        }
        Ok(slug)
    }

    async fn ensure_unique_slug(&self, slug: &str, exclude: Option<Uuid>) -> Result<(), AppError> {
        let mut query = CatalogRecords::find()
            .filter(Column::Kind.eq(self.kind))
            .filter(Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            return Err(AppError::BadRequest(format!(
                "A {} with slug '{}' already exists",
                self.kind, slug
            )));
        }
        Ok(())
    }

    /// 校验父级：种类必须匹配；`required` 为真时缺失即报错。
    async fn check_parent(&self, parent_id: Option<Uuid>, required: bool) -> Result<(), AppError> {
        let Some(parent_kind) = self.kind.parent() else {
            if parent_id.is_some() {
                return Err(AppError::BadRequest(format!("A {} has no parent", self.kind)));
            }
            return Ok(());
        };

        let Some(parent_id) = parent_id else {
            if required {
                return Err(AppError::BadRequest(format!(
                    "parent_id ({}) is required for a {}",
                    parent_kind, self.kind
                )));
            }
            return Ok(());
        };

        let exists = CatalogRecords::find_by_id(parent_id)
            .filter(Column::Kind.eq(parent_kind))
            .count(&self.db)
            .await?;
        if exists == 0 {
            return Err(AppError::BadRequest(format!(
                "Parent {} {} not found",
                parent_kind, parent_id
            )));
        }
        Ok(())
    }

    fn check_files(&self, files: &[UploadedFile]) -> Result<(), AppError> {
        match self.kind.image_policy() {
            ImagePolicy::None if !files.is_empty() => Err(AppError::BadRequest(format!(
                "A {} does not accept images",
                self.kind
            ))),
            ImagePolicy::Single if files.len() > 1 => Err(AppError::BadRequest(format!(
                "A {} accepts a single image",
                self.kind
            ))),
            _ if files.len() > MAX_UPLOAD_FILES => Err(AppError::BadRequest(format!(
                "At most {} images can be uploaded at once",
                MAX_UPLOAD_FILES
            ))),
            _ => Ok(()),
        }
    }

    fn folder(&self) -> &'static str {
        self.kind.upload_folder()
    }

    /// 条件写入：给出 `expected` 时，库中的 `updated_at` 必须仍等于它，否则不更新任何行
    async fn write(
        &self,
        active: catalog_records::ActiveModel,
        expected: Option<DateTimeWithTimeZone>,
    ) -> Result<catalog_records::Model, DbErr> {
        let mut update = CatalogRecords::update(active);
        if let Some(expected) = expected {
            update = update.filter(Column::UpdatedAt.eq(expected));
        }
        update.exec(&self.db).await
    }
}

#[async_trait]
impl Repository for CatalogRepository {
    type Record = CatalogRecordDto;
    type Input = CatalogPayload;

    async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<(Vec<CatalogRecordDto>, Pagination), AppError> {
        query.validate()?;

        let mut select = CatalogRecords::find().filter(Column::Kind.eq(self.kind));

        // 名称上的大小写不敏感子串匹配
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(contains_ignore_case(Column::Name, search));
        }
        if let Some(parent_id) = query.parent_id {
            select = select.filter(Column::ParentId.eq(parent_id));
        }
        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status));
        }

        let order = match query.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        let select = select
            .order_by(self.sort_column(query.sort_by.as_deref())?, order)
            .order_by(Column::Id, Order::Asc);

        let paginator = select.paginate(&self.db, query.limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(query.page - 1).await?;

        Ok((
            rows.into_iter().map(CatalogRecordDto::from).collect(),
            Pagination::new(query.page, query.limit, total),
        ))
    }

    async fn get(&self, id: Uuid) -> Result<CatalogRecordDto, AppError> {
        Ok(self.find(id).await?.into())
    }

    async fn create(&self, payload: CatalogPayload) -> Result<CatalogRecordDto, AppError> {
        let CatalogPayload { input, files } = payload;
        input.validate()?;

        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?
            .to_string();
        let slug = self.resolve_slug(input.slug.as_deref(), &name)?;
        self.ensure_unique_slug(&slug, None).await?;
        self.check_parent(input.parent_id, true).await?;
        self.check_files(&files)?;

        let uploaded = self.uploads.save_all(self.folder(), &files).await?;
        let changes = reconcile_images(&[], None, uploaded.clone(), self.kind.image_policy());

        let timestamp = now();
        let record = catalog_records::ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(self.kind),
            name: Set(name),
            slug: Set(slug.clone()),
            parent_id: Set(input.parent_id),
            description: Set(input.description.filter(|d| !d.trim().is_empty())),
            attributes: Set(input.attributes),
            images: Set(serde_json::json!(changes.images)),
            status: Set(input.status.unwrap_or(true)),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        };

        let model = match record.insert(&self.db).await {
            Ok(model) => model,
            Err(e) => {
                self.uploads.remove_all(&uploaded).await;
                return Err(map_write_error(
                    e,
                    format!("A {} with slug '{}' already exists", self.kind, slug),
                ));
            }
        };

        tracing::info!("✨ Created {} {} ({})", self.kind, model.id, model.slug);
        Ok(model.into())
    }

    async fn update(
        &self,
        id: Uuid,
        payload: CatalogPayload,
    ) -> Result<CatalogRecordDto, AppError> {
        let CatalogPayload { input, files } = payload;
        input.validate()?;

        let record = self.find(id).await?;
        check_precondition(input.expected_updated_at, record.updated_at)?;
        self.check_files(&files)?;

        let mut active: catalog_records::ActiveModel = record.clone().into();

        let new_name = input.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        // slug 未显式给出时跟随改名重新生成
        let new_slug = match (input.slug.as_deref(), new_name) {
            (Some(explicit), _) => Some(self.resolve_slug(Some(explicit), &record.name)?),
            (None, Some(name)) if name != record.name => Some(self.resolve_slug(None, name)?),
            _ => None,
        };
        if let Some(slug) = new_slug.as_ref().filter(|s| **s != record.slug) {
            self.ensure_unique_slug(slug, Some(id)).await?;
            active.slug = Set(slug.clone());
        }
        if let Some(name) = new_name {
            active.name = Set(name.to_string());
        }

        if input.parent_id.is_some() {
            if input.parent_id == Some(id) {
                return Err(AppError::BadRequest("A record cannot be its own parent".to_string()));
            }
            self.check_parent(input.parent_id, false).await?;
            active.parent_id = Set(input.parent_id);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        if let Some(attributes) = input.attributes {
            active.attributes = Set(Some(attributes).filter(|a| !a.is_null()));
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }

        let uploaded = self.uploads.save_all(self.folder(), &files).await?;
        let changes = reconcile_images(
            &record.image_list(),
            input.existing_images.as_deref(),
            uploaded.clone(),
            self.kind.image_policy(),
        );
        active.images = Set(serde_json::json!(changes.images));
        active.updated_at = Set(now());

        let updated = match self.write(active, input.expected_updated_at).await {
            Ok(model) => model,
            Err(e) => {
                self.uploads.remove_all(&uploaded).await;
                return Err(map_write_error(e, format!("Duplicate slug for {}", self.kind)));
            }
        };

        // 数据库写入成功后才删除被替换的文件
        self.uploads.remove_all(&changes.to_delete).await;

        tracing::info!("📝 Updated {} {}", self.kind, id);
        Ok(updated.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let record = self.find(id).await?;

        let children = CatalogRecords::find()
            .filter(Column::ParentId.eq(id))
            .count(&self.db)
            .await?;
        if children > 0 {
            return Err(AppError::Conflict(format!(
                "{} {} still has {} dependent record(s)",
                self.kind, id, children
            )));
        }

        CatalogRecords::delete_by_id(id).exec(&self.db).await?;
        self.uploads.remove_all(&record.image_list()).await;

        tracing::info!("🗑️ Deleted {} {}", self.kind, id);
        Ok(())
    }

    async fn toggle_status(&self, id: Uuid) -> Result<CatalogRecordDto, AppError> {
        let record = self.find(id).await?;
        let status = !record.status;

        let mut active: catalog_records::ActiveModel = record.into();
        active.status = Set(status);
        active.updated_at = Set(now());
        let updated = active.update(&self.db).await?;

        Ok(updated.into())
    }
}

/// 仪表盘：各种类记录总数与启用数
pub async fn dashboard_stats(
    db: &DatabaseConnection,
) -> Result<BTreeMap<String, KindStats>, AppError> {
    let totals: Vec<(ResourceKind, i64)> = CatalogRecords::find()
        .select_only()
        .column(Column::Kind)
        .column_as(Column::Id.count(), "total")
        .group_by(Column::Kind)
        .into_tuple()
        .all(db)
        .await?;

    let active: Vec<(ResourceKind, i64)> = CatalogRecords::find()
        .select_only()
        .column(Column::Kind)
        .column_as(Column::Id.count(), "active")
        .filter(Column::Status.eq(true))
        .group_by(Column::Kind)
        .into_tuple()
        .all(db)
        .await?;

    let mut stats: BTreeMap<String, KindStats> = ResourceKind::iter()
        .map(|kind| (kind.path().to_string(), KindStats::default()))
        .collect();
    for (kind, count) in totals {
        stats.entry(kind.path().to_string()).or_default().total = count as u64;
    }
    for (kind, count) in active {
        stats.entry(kind.path().to_string()).or_default().active = count as u64;
    }
    Ok(stats)
}
