// src/core/enums.rs

use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 管理员角色枚举（写入 JWT 的 role 声明）
/// 同时支持：
/// 1. 数据库映射 (SeaORM) - 存为字符串 "super-admin" / "admin" / "sub-admin"
/// 2. JSON 序列化 (Serde) - 前端交互
/// 3. 字符串转换 (Strum) - 中间件中解析令牌声明
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum AdminRole {
    #[sea_orm(string_value = "super-admin")]
    SuperAdmin,

    #[sea_orm(string_value = "admin")]
    Admin,

    /// 子管理员：受角色权限矩阵约束
    #[sea_orm(string_value = "sub-admin")]
    SubAdmin,
}

impl AdminRole {
    pub const ALL: &'static [AdminRole] =
        &[AdminRole::SuperAdmin, AdminRole::Admin, AdminRole::SubAdmin];
    pub const MANAGERS: &'static [AdminRole] = &[AdminRole::SuperAdmin, AdminRole::Admin];
    pub const SUPER_ONLY: &'static [AdminRole] = &[AdminRole::SuperAdmin];
}

/// 图片字段策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePolicy {
    None,
    /// 只保留最新上传的一张
    Single,
    Multiple,
}

/// 目录资源种类。每个种类携带自己的“模式”：路由路径、父级种类、图片策略、
/// 上传目录以及所属的权限模块，通用仓储据此工作。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ResourceKind {
    #[sea_orm(string_value = "country")]
    Country,
    #[sea_orm(string_value = "state")]
    State,
    #[sea_orm(string_value = "city")]
    City,
    #[sea_orm(string_value = "category")]
    Category,
    #[sea_orm(string_value = "subcategory")]
    Subcategory,
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "service")]
    Service,
    #[sea_orm(string_value = "cms_page")]
    CmsPage,
    #[sea_orm(string_value = "banner")]
    Banner,
    #[sea_orm(string_value = "news")]
    News,
    #[sea_orm(string_value = "blog")]
    Blog,
    #[sea_orm(string_value = "faq")]
    Faq,
}

impl ResourceKind {
    /// REST 路由段，例如 `/countries`
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Country => "countries",
            ResourceKind::State => "states",
            ResourceKind::City => "cities",
            ResourceKind::Category => "categories",
            ResourceKind::Subcategory => "subcategories",
            ResourceKind::Product => "products",
            ResourceKind::Service => "services",
            ResourceKind::CmsPage => "cms",
            ResourceKind::Banner => "banners",
            ResourceKind::News => "news",
            ResourceKind::Blog => "blogs",
            ResourceKind::Faq => "faqs",
        }
    }

    /// 父级种类（存在即为必填）
    pub fn parent(self) -> Option<ResourceKind> {
        match self {
            ResourceKind::State => Some(ResourceKind::Country),
            ResourceKind::City => Some(ResourceKind::State),
            ResourceKind::Subcategory | ResourceKind::Product => Some(ResourceKind::Category),
            _ => None,
        }
    }

    pub fn image_policy(self) -> ImagePolicy {
        match self {
            ResourceKind::Category
            | ResourceKind::Subcategory
            | ResourceKind::Banner
            | ResourceKind::News
            | ResourceKind::Blog => ImagePolicy::Single,
            ResourceKind::Product | ResourceKind::Service => ImagePolicy::Multiple,
            _ => ImagePolicy::None,
        }
    }

    /// 上传子目录：`<upload_dir>/<folder>/`
    pub fn upload_folder(self) -> &'static str {
        self.path()
    }

    /// 权限矩阵中的模块名称
    pub fn module(self) -> &'static str {
        match self {
            ResourceKind::Country | ResourceKind::State | ResourceKind::City => "locations",
            ResourceKind::Category | ResourceKind::Subcategory => "categories",
            ResourceKind::Product => "products",
            ResourceKind::Service => "services",
            ResourceKind::CmsPage => "cms",
            ResourceKind::Banner => "banners",
            ResourceKind::News => "news",
            ResourceKind::Blog => "blogs",
            ResourceKind::Faq => "faqs",
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// 权限矩阵中的单个操作位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    View,
    Add,
    Edit,
    Delete,
}

impl PermissionAction {
    /// HTTP 方法到操作位的映射：GET 查看，POST 新增，PUT/PATCH 编辑，DELETE 删除
    pub fn from_method(method: &axum::http::Method) -> Self {
        use axum::http::Method;
        if *method == Method::POST {
            PermissionAction::Add
        } else if *method == Method::PUT || *method == Method::PATCH {
            PermissionAction::Edit
        } else if *method == Method::DELETE {
            PermissionAction::Delete
        } else {
            PermissionAction::View
        }
    }
}
