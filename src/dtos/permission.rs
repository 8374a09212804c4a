// src/dtos/permission.rs
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::enums::PermissionAction;

/// 单个 (角色, 模块) 的权限位。
///
/// 不变量：`all == view && add && edit && delete`。反序列化得到的值可能不满足该不变量，
/// 落库前必须经过 [`PermissionFlags::normalized`]。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub add: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub all: bool,
}

impl PermissionFlags {
    pub fn new(view: bool, add: bool, edit: bool, delete: bool) -> Self {
        Self {
            view,
            add,
            edit,
            delete,
            all: view && add && edit && delete,
        }
    }

    pub fn full() -> Self {
        Self::new(true, true, true, true)
    }

    /// `all` 为真时展开为四个子权限；否则以子权限重新推导 `all`。
    pub fn normalized(self) -> Self {
        if self.all {
            Self::full()
        } else {
            Self::new(self.view, self.add, self.edit, self.delete)
        }
    }

    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.view,
            PermissionAction::Add => self.add,
            PermissionAction::Edit => self.edit,
            PermissionAction::Delete => self.delete,
        }
    }

    pub fn set(&mut self, action: PermissionAction, value: bool) {
        match action {
            PermissionAction::View => self.view = value,
            PermissionAction::Add => self.add = value,
            PermissionAction::Edit => self.edit = value,
            PermissionAction::Delete => self.delete = value,
        }
        self.all = self.view && self.add && self.edit && self.delete;
    }

    pub fn set_all(&mut self, value: bool) {
        *self = Self::new(value, value, value, value);
    }
}

/// 编辑器中的一行：模块 + 权限位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRow {
    pub module_id: i32,
    pub module: String,
    #[serde(flatten)]
    pub flags: PermissionFlags,
}

/// `GET /roles/{id}/permissions` 的响应：每个模块一行，缺失记录默认全 false
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMatrix {
    pub role_id: Uuid,
    pub role_name: String,
    pub updated_at: DateTime<FixedOffset>,
    pub permissions: Vec<PermissionRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionInput {
    pub module_id: i32,
    #[serde(flatten)]
    pub flags: PermissionFlags,
}

/// `PUT /roles/{id}/permissions`：整体覆盖该角色的全部权限
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SavePermissionsRequest {
    #[validate(length(max = 256, message = "Too many permission rows"))]
    pub permissions: Vec<PermissionInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_updated_at: Option<DateTime<FixedOffset>>,
}
