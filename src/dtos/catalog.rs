// src/dtos/catalog.rs
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::{
        constants::DEFAULT_PAGE_SIZE,
        enums::{ResourceKind, SortOrder},
        error::AppError,
    },
    entity::catalog_records,
};

/// 列表查询参数：`?page=1&limit=10&sort_by=name&order=asc&search=ind`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    // 上限保证 `limit * (page - 1)` 不会溢出
    #[validate(range(min = 1, max = 1_000_000, message = "page must be between 1 and 1000000"))]
    pub page: u64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: u64,

    #[serde(default, alias = "sortBy")]
    pub sort_by: Option<String>,

    #[serde(default)]
    pub order: SortOrder,

    #[serde(default)]
    pub search: Option<String>,

    #[serde(default, alias = "parentId")]
    pub parent_id: Option<Uuid>,

    #[serde(default)]
    pub status: Option<bool>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            sort_by: None,
            order: SortOrder::default(),
            search: None,
            parent_id: None,
            status: None,
        }
    }
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// 创建 / 更新目录记录的载荷。JSON 请求体直接反序列化；
/// multipart 请求通过 [`CatalogInput::from_form_fields`] 从文本字段构造。
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CatalogInput {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    #[serde(default, alias = "title")]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 200, message = "slug must be 1-200 characters"))]
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default, alias = "parentId")]
    pub parent_id: Option<Uuid>,

    #[serde(default, alias = "content")]
    pub description: Option<String>,

    #[serde(default)]
    pub attributes: Option<Value>,

    #[serde(default)]
    pub status: Option<bool>,

    /// 更新时保留的旧图片；缺省表示全部保留
    #[serde(default, alias = "existingImages")]
    pub existing_images: Option<Vec<String>>,

    /// 乐观锁前置条件：与记录当前的 `updated_at` 不一致则拒绝
    #[serde(default, alias = "expectedUpdatedAt")]
    pub expected_updated_at: Option<DateTime<FixedOffset>>,
}

impl CatalogInput {
    /// 从 multipart 文本字段构造载荷。字段名同时接受 snake_case 与 camelCase。
    pub fn from_form_fields(fields: &HashMap<String, String>) -> Result<Self, AppError> {
        let get = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| fields.get(*n))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let parent_id = get(&["parent_id", "parentId"])
            .map(|v| {
                Uuid::parse_str(&v)
                    .map_err(|_| AppError::BadRequest(format!("Invalid parent_id: {}", v)))
            })
            .transpose()?;

        let status = get(&["status"]).map(|v| parse_bool(&v)).transpose()?;

        let attributes = get(&["attributes"])
            .map(|v| {
                serde_json::from_str::<Value>(&v)
                    .map_err(|e| AppError::BadRequest(format!("Invalid attributes JSON: {}", e)))
            })
            .transpose()?;

        // existingImages 以 JSON 字符串数组的形式提交
        let existing_images = fields
            .get("existing_images")
            .or_else(|| fields.get("existingImages"))
            .map(|v| {
                let raw = v.trim();
                if raw.is_empty() {
                    Ok(Vec::new())
                } else {
                    serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
                        AppError::BadRequest(format!("Invalid existing_images: {}", e))
                    })
                }
            })
            .transpose()?;

        let expected_updated_at = get(&["expected_updated_at", "expectedUpdatedAt"])
            .map(|v| {
                DateTime::parse_from_rfc3339(&v).map_err(|_| {
                    AppError::BadRequest(format!("Invalid expected_updated_at: {}", v))
                })
            })
            .transpose()?;

        Ok(Self {
            name: get(&["name", "title"]),
            slug: get(&["slug"]),
            parent_id,
            description: get(&["description", "content"]),
            attributes,
            status,
            existing_images,
            expected_updated_at,
        })
    }
}

fn parse_bool(raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(AppError::BadRequest(format!("Invalid boolean: {}", raw))),
    }
}

/// 对外返回的目录记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecordDto {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub description: Option<String>,
    pub attributes: Option<Value>,
    pub images: Vec<String>,
    pub status: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<catalog_records::Model> for CatalogRecordDto {
    fn from(m: catalog_records::Model) -> Self {
        let images = m.image_list();
        Self {
            id: m.id,
            kind: m.kind,
            name: m.name,
            slug: m.slug,
            parent_id: m.parent_id,
            description: m.description,
            attributes: m.attributes,
            images,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// 仪表盘中单个种类的统计
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KindStats {
    pub total: u64,
    pub active: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn form_fields_accept_camel_case_and_json_arrays() {
        let parent = Uuid::new_v4();
        let input = CatalogInput::from_form_fields(&fields(&[
            ("title", "  Summer Sale "),
            ("parentId", &parent.to_string()),
            ("status", "false"),
            ("existingImages", r#"["uploads/banners/a.jpg","uploads/banners/c.jpg"]"#),
            ("attributes", r#"{"link":"/sale"}"#),
        ]))
        .unwrap();

        assert_eq!(input.name.as_deref(), Some("Summer Sale"));
        assert_eq!(input.parent_id, Some(parent));
        assert_eq!(input.status, Some(false));
        assert_eq!(input.existing_images.unwrap().len(), 2);
        assert_eq!(input.attributes.unwrap()["link"], "/sale");
    }

    #[test]
    fn empty_existing_images_means_drop_all() {
        let input = CatalogInput::from_form_fields(&fields(&[("existing_images", "")])).unwrap();
        assert_eq!(input.existing_images, Some(vec![]));

        let input = CatalogInput::from_form_fields(&fields(&[("name", "x")])).unwrap();
        assert_eq!(input.existing_images, None);
    }

    #[test]
    fn malformed_form_values_are_bad_requests() {
        assert!(matches!(
            CatalogInput::from_form_fields(&fields(&[("status", "maybe")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            CatalogInput::from_form_fields(&fields(&[("parent_id", "not-a-uuid")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            CatalogInput::from_form_fields(&fields(&[("existing_images", "a.jpg")])),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn list_query_rejects_oversized_limit() {
        let q = ListQuery { limit: 500, ..ListQuery::default() };
        assert!(q.validate().is_err());
        let q = ListQuery { page: 0, ..ListQuery::default() };
        assert!(q.validate().is_err());
        assert!(ListQuery::default().validate().is_ok());
    }

    #[test]
    fn huge_page_numbers_fail_validation() {
        let query = ListQuery { page: u64::MAX, ..Default::default() };
        assert!(query.validate().is_err());
        let query = ListQuery { page: 1_000_000, limit: 100, ..Default::default() };
        assert!(query.validate().is_ok());
    }
}
