// src/dtos/user.rs
use crate::dtos::PHONE_REGEX;
use crate::core::enums::AdminRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::entity::users;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub phone: Option<String>,
    pub role: AdminRole,
    pub role_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<users::Model> for UserProfile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            phone: user.phone,
            role: user.role,
            role_id: user.role_id,
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(regex(path = *PHONE_REGEX, message = "Invalid phone number format"))]
    pub phone: Option<String>,
}
