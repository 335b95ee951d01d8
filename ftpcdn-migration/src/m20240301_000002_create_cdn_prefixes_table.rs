use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Name and prefix uniqueness is checked by the registry, not by constraints
        manager
            .create_table(
                Table::create()
                    .table(CdnPrefixes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CdnPrefixes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CdnPrefixes::Name).string().not_null())
                    .col(ColumnDef::new(CdnPrefixes::PrefixUrl).string().not_null())
                    .col(ColumnDef::new(CdnPrefixes::Description).string())
                    .col(
                        ColumnDef::new(CdnPrefixes::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CdnPrefixes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CdnPrefixes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CdnPrefixes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-cdn_prefixes-is_default")
                    .table(CdnPrefixes::Table)
                    .col(CdnPrefixes::IsDefault)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CdnPrefixes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CdnPrefixes {
    Table,
    Id,
    Name,
    PrefixUrl,
    Description,
    IsDefault,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
