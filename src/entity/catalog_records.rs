use sea_orm::entity::prelude::*;

use crate::core::enums::ResourceKind;

/// 所有目录资源共用的一张表，`kind` 区分种类，`(kind, slug)` 唯一。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "catalog_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: ResourceKind,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// 价格、链接、作者等种类专属字段
    pub attributes: Option<Json>,
    /// 相对路径数组，如 `["uploads/products/<uuid>.jpg"]`
    pub images: Json,
    pub status: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Restrict"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// `images` 列解码为字符串列表；非数组内容视为空。
    pub fn image_list(&self) -> Vec<String> {
        serde_json::from_value(self.images.clone()).unwrap_or_default()
    }
}
