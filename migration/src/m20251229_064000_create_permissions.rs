use sea_orm_migration::prelude::*;

use crate::m20251229_063000_create_roles::Roles;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 预置的后台模块，权限矩阵的行
const MODULES: &[&str] = &[
    "dashboard",
    "users",
    "roles",
    "locations",
    "categories",
    "products",
    "services",
    "cms",
    "banners",
    "news",
    "blogs",
    "faqs",
    "settings",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. 模块表 + 预置数据
        manager
            .create_table(
                Table::create()
                    .table(AdminModules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminModules::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdminModules::Name).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        let mut seed = Query::insert();
        seed.into_table(AdminModules::Table).columns([AdminModules::Name]);
        for name in MODULES {
            seed.values_panic([(*name).into()]);
        }
        manager.exec_stmt(seed).await?;

        // 2. 权限表：每个 (角色, 模块) 至多一行
        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Permissions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Permissions::RoleId).uuid().not_null())
                    .col(ColumnDef::new(Permissions::ModuleId).integer().not_null())
                    .col(ColumnDef::new(Permissions::CanView).boolean().not_null().default(false))
                    .col(ColumnDef::new(Permissions::CanAdd).boolean().not_null().default(false))
                    .col(ColumnDef::new(Permissions::CanEdit).boolean().not_null().default(false))
                    .col(ColumnDef::new(Permissions::CanDelete).boolean().not_null().default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permissions_role_id")
                            .from(Permissions::Table, Permissions::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permissions_module_id")
                            .from(Permissions::Table, Permissions::ModuleId)
                            .to(AdminModules::Table, AdminModules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_permissions_role_module")
                    .table(Permissions::Table)
                    .col(Permissions::RoleId)
                    .col(Permissions::ModuleId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Permissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdminModules::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AdminModules {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Permissions {
    Table,
    Id,
    RoleId,
    ModuleId,
    CanView,
    CanAdd,
    CanEdit,
    CanDelete,
}
