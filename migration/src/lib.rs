pub use sea_orm_migration::prelude::*;

mod m20251229_063000_create_roles;
mod m20251229_063323_create_users;
mod m20251229_064000_create_permissions;
mod m20251229_065000_create_catalog_records;
mod m20251229_066000_create_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251229_063000_create_roles::Migration),
            Box::new(m20251229_063323_create_users::Migration),
            Box::new(m20251229_064000_create_permissions::Migration),
            Box::new(m20251229_065000_create_catalog_records::Migration),
            Box::new(m20251229_066000_create_settings::Migration),
        ]
    }
}
