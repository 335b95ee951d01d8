use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FileRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FileRecords::OriginalName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FileRecords::StorageName).string().not_null())
                    .col(
                        ColumnDef::new(FileRecords::Extension)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(FileRecords::SizeBytes).big_integer().not_null())
                    .col(
                        ColumnDef::new(FileRecords::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(FileRecords::CdnPrefix).string().not_null())
                    .col(ColumnDef::new(FileRecords::FullUrl).string().not_null())
                    .col(ColumnDef::new(FileRecords::RemotePath).string().not_null())
                    .col(
                        ColumnDef::new(FileRecords::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(FileRecords::DownloadCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // Storage names are unique by construction, so this index is not unique
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-file_records-storage_name")
                    .table(FileRecords::Table)
                    .col(FileRecords::StorageName)
                    .to_owned(),
            )
            .await?;

        // Listing and search both order by upload time
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-file_records-uploaded_at")
                    .table(FileRecords::Table)
                    .col(FileRecords::UploadedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FileRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FileRecords {
    Table,
    Id,
    OriginalName,
    StorageName,
    Extension,
    SizeBytes,
    Description,
    CdnPrefix,
    FullUrl,
    RemotePath,
    UploadedAt,
    DownloadCount,
}
