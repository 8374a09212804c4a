use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entity::roles;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RoleInput {
    #[validate(length(min = 2, max = 100, message = "Role name must be 2-100 characters"))]
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default, alias = "expectedUpdatedAt", skip_serializing_if = "Option::is_none")]
    pub expected_updated_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDto {
    pub id: Uuid,
    pub name: String,
    pub status: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<roles::Model> for RoleDto {
    fn from(m: roles::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
