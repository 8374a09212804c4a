// src/services/user.rs
use sea_orm::*;
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::error::AppError,
    dtos::user::{UpdateUserRequest, UserProfile},
    entity::users,
    services::map_write_error,
    utils::now,
};

fn parse_user_id(user_id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(user_id).map_err(|_| AppError::AuthError("Invalid User ID format".to_string()))
}

/// 获取用户资料。`user_id` 来自 JWT 的 sub 声明。
pub async fn get_user_profile(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<UserProfile, AppError> {
    let user = users::Entity::find_by_id(parse_user_id(user_id)?)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(user.into())
}

/// 更新用户资料，目前只允许修改手机号。
pub async fn update_user_profile(
    db: &DatabaseConnection,
    user_id: &str,
    req: UpdateUserRequest,
) -> Result<UserProfile, AppError> {
    req.validate()?;

    let user = users::Entity::find_by_id(parse_user_id(user_id)?)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let mut user_active: users::ActiveModel = user.into();
    if let Some(phone) = req.phone {
        user_active.phone = Set(Some(phone));
    }
    user_active.updated_at = Set(now());

    let updated_user = user_active
        .update(db)
        .await
        .map_err(|e| map_write_error(e, "Phone already in use"))?;
    Ok(updated_user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::enums::AdminRole, test_support::memory_db};

    #[tokio::test]
    async fn profile_update_changes_phone() {
        let db = memory_db().await;
        let ts = now();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set("ops".into()),
            password_hash: Set("x".into()),
            phone: Set(None),
            role: Set(AdminRole::Admin),
            role_id: Set(None),
            is_active: Set(true),
            created_at: Set(ts),
            updated_at: Set(ts),
        }
        .insert(&db)
        .await
        .unwrap();

        let id = user.id.to_string();
        let phone = UpdateUserRequest { phone: Some("+919876543210".into()) };
        let profile = update_user_profile(&db, &id, phone).await.unwrap();
        assert_eq!(profile.phone.as_deref(), Some("+919876543210"));
        assert_eq!(get_user_profile(&db, &id).await.unwrap().phone, profile.phone);

        let bad_phone = UpdateUserRequest { phone: Some("call me".into()) };
        let bad = update_user_profile(&db, &id, bad_phone).await;
        assert!(matches!(bad, Err(AppError::ValidationError(_))));
        assert!(matches!(get_user_profile(&db, "nope").await, Err(AppError::AuthError(_))));
    }
}
