use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CatalogRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CatalogRecords::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CatalogRecords::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(CatalogRecords::Name).string().not_null())
                    .col(ColumnDef::new(CatalogRecords::Slug).string().not_null())
                    .col(ColumnDef::new(CatalogRecords::ParentId).uuid().null())
                    .col(ColumnDef::new(CatalogRecords::Description).text().null())
                    .col(ColumnDef::new(CatalogRecords::Attributes).json().null())
                    .col(
                        ColumnDef::new(CatalogRecords::Images)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(ColumnDef::new(CatalogRecords::Status).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(CatalogRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CatalogRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // 仍有子记录的父级不可删除
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalog_records_parent_id")
                            .from(CatalogRecords::Table, CatalogRecords::ParentId)
                            .to(CatalogRecords::Table, CatalogRecords::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_records_kind_slug")
                    .table(CatalogRecords::Table)
                    .col(CatalogRecords::Kind)
                    .col(CatalogRecords::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_records_kind_parent")
                    .table(CatalogRecords::Table)
                    .col(CatalogRecords::Kind)
                    .col(CatalogRecords::ParentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CatalogRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CatalogRecords {
    Table,
    Id,
    Kind,
    Name,
    Slug,
    ParentId,
    Description,
    Attributes,
    Images,
    Status,
    CreatedAt,
    UpdatedAt,
}
