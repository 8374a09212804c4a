// src/services/permission.rs
use std::collections::{HashMap, HashSet};

use sea_orm::{prelude::DateTimeWithTimeZone, *};
use uuid::Uuid;

use crate::{
    core::error::AppError,
    dtos::permission::{PermissionFlags, PermissionMatrix, PermissionRow, SavePermissionsRequest},
    entity::{admin_modules, permissions, roles},
    services::map_write_error,
    utils::now,
};

/// 全部模块，按 id 排序
pub async fn list_modules(db: &DatabaseConnection) -> Result<Vec<admin_modules::Model>, AppError> {
    Ok(admin_modules::Entity::find()
        .order_by_asc(admin_modules::Column::Id)
        .all(db)
        .await?)
}

/// 读取角色的权限矩阵。每个模块一行，缺失记录默认全部为 false。
pub async fn load_matrix(
    db: &DatabaseConnection,
    role_id: Uuid,
) -> Result<PermissionMatrix, AppError> {
    let role = roles::Entity::find_by_id(role_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {} not found", role_id)))?;

    let modules = list_modules(db).await?;
    let mut granted: HashMap<i32, PermissionFlags> = permissions::Entity::find()
        .filter(permissions::Column::RoleId.eq(role_id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.module_id, flags_of(&p)))
        .collect();

    let permissions = modules
        .into_iter()
        .map(|m| PermissionRow {
            module_id: m.id,
            flags: granted.remove(&m.id).unwrap_or_default(),
            module: m.name,
        })
        .collect();

    Ok(PermissionMatrix {
        role_id: role.id,
        role_name: role.name,
        updated_at: role.updated_at,
        permissions,
    })
}

/// 整体覆盖角色的权限（无部分更新语义），并刷新角色的 `updated_at`。
pub async fn save_matrix(
    db: &DatabaseConnection,
    role_id: Uuid,
    req: SavePermissionsRequest,
) -> Result<PermissionMatrix, AppError> {
    let known: HashSet<i32> = list_modules(db).await?.into_iter().map(|m| m.id).collect();

    let mut seen = HashSet::new();
    for row in &req.permissions {
        if !known.contains(&row.module_id) {
            return Err(AppError::BadRequest(format!("Unknown module id {}", row.module_id)));
        }
        if !seen.insert(row.module_id) {
            return Err(AppError::BadRequest(format!("Module id {} listed twice", row.module_id)));
        }
    }

    let txn = db.begin().await?;
    claim_role(&txn, role_id, req.expected_updated_at).await?;

    permissions::Entity::delete_many()
        .filter(permissions::Column::RoleId.eq(role_id))
        .exec(&txn)
        .await?;

    let rows: Vec<permissions::ActiveModel> = req
        .permissions
        .iter()
        .map(|row| {
            let flags = row.flags.normalized();
            permissions::ActiveModel {
                id: Set(Uuid::new_v4()),
                role_id: Set(role_id),
                module_id: Set(row.module_id),
                can_view: Set(flags.view),
                can_add: Set(flags.add),
                can_edit: Set(flags.edit),
                can_delete: Set(flags.delete),
            }
        })
        .collect();
    if !rows.is_empty() {
        permissions::Entity::insert_many(rows).exec(&txn).await?;
    }

    txn.commit().await?;
    tracing::info!("🔐 Saved {} permission row(s) for role {}", req.permissions.len(), role_id);

    load_matrix(db, role_id).await
}

/// 在事务内锁定角色行并刷新 `updated_at`。
/// 给出 `expected` 时更新带上 `updated_at = expected` 条件，未命中任何行返回 409，
/// 并发的两次保存只有一次能通过。
async fn claim_role(
    txn: &DatabaseTransaction,
    role_id: Uuid,
    expected: Option<DateTimeWithTimeZone>,
) -> Result<roles::Model, AppError> {
    let role = roles::Entity::find_by_id(role_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {} not found", role_id)))?;

    let mut active: roles::ActiveModel = role.into();
    active.updated_at = Set(now());
    let mut update = roles::Entity::update(active);
    if let Some(expected) = expected {
        update = update.filter(roles::Column::UpdatedAt.eq(expected));
    }
    update
        .exec(txn)
        .await
        .map_err(|e| map_write_error(e, format!("Role {} could not be updated", role_id)))
}

/// 中间件使用：查询角色在某模块上的权限。角色停用时视为没有权限。
pub async fn module_flags(
    db: &DatabaseConnection,
    role_id: Uuid,
    module: &str,
) -> Result<Option<PermissionFlags>, AppError> {
    let active_role = roles::Entity::find_by_id(role_id)
        .filter(roles::Column::Status.eq(true))
        .count(db)
        .await?;
    if active_role == 0 {
        return Ok(None);
    }

    let row = permissions::Entity::find()
        .filter(permissions::Column::RoleId.eq(role_id))
        .inner_join(admin_modules::Entity)
        .filter(admin_modules::Column::Name.eq(module))
        .one(db)
        .await?;

    Ok(row.as_ref().map(flags_of))
}

fn flags_of(p: &permissions::Model) -> PermissionFlags {
    PermissionFlags::new(p.can_view, p.can_add, p.can_edit, p.can_delete)
}
