// src/services/setting.rs
use std::collections::BTreeMap;

use sea_orm::{sea_query::OnConflict, *};
use validator::Validate;

use crate::{
    core::error::AppError,
    dtos::setting::UpdateSettingsRequest,
    entity::settings,
    utils::now,
};

pub async fn get_all(db: &DatabaseConnection) -> Result<BTreeMap<String, String>, AppError> {
    Ok(settings::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect())
}

/// 按键写入（存在则覆盖），返回写入后的全部设置
pub async fn update(
    db: &DatabaseConnection,
    req: UpdateSettingsRequest,
) -> Result<BTreeMap<String, String>, AppError> {
    req.validate()?;

    let timestamp = now();
    let rows = req.values.into_iter().map(|(key, value)| settings::ActiveModel {
        key: Set(key),
        value: Set(value),
        updated_at: Set(timestamp),
    });

    settings::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::column(settings::Column::Key)
                .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                .to_owned(),
        )
        .exec(db)
        .await?;

    get_all(db).await
}
