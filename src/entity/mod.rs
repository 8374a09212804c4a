//! SeaORM 实体定义，与 `migration` crate 中的表结构一一对应。

pub mod admin_modules;
pub mod catalog_records;
pub mod permissions;
pub mod roles;
pub mod settings;
pub mod users;
