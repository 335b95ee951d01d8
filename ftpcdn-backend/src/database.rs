use crate::error::Result;
use ftpcdn_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

pub async fn setup_database(database_url: &str) -> Result<DatabaseConnection> {
    tracing::info!("🔗 Connecting to database: {}", database_url);

    // Configure connection options
    let mut opt = ConnectOptions::new(database_url.to_string());
    opt.max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true);

    // Connect to database
    let db = Database::connect(opt).await?;

    // Run migrations
    tracing::info!("🔄 Running database migrations...");
    Migrator::up(&db, None).await?;
    tracing::info!("✅ Migrations completed successfully");

    Ok(db)
}

/// One page of a file listing. `page` is 1-based.
#[derive(Debug, Clone)]
pub struct FilePage {
    pub items: Vec<ftpcdn_entity::file_record::Model>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

// Helper functions for file record operations
pub mod file_ops {
    use super::*;
    use ftpcdn_entity::{file_record, prelude::*};
    use sea_orm::sea_query::Expr;
    use sea_orm::*;

    /// Everything about a file record that is known once the upload has landed remotely
    #[derive(Debug, Clone)]
    pub struct NewFileRecord {
        pub original_name: String,
        pub storage_name: String,
        pub extension: String,
        pub size_bytes: i64,
        pub description: String,
        pub cdn_prefix: String,
        pub full_url: String,
        pub remote_path: String,
    }

    pub async fn create_file_record(
        db: &DatabaseConnection,
        record: NewFileRecord,
    ) -> Result<file_record::Model> {
        let file_model = file_record::ActiveModel {
            original_name: Set(record.original_name),
            storage_name: Set(record.storage_name),
            extension: Set(record.extension),
            size_bytes: Set(record.size_bytes),
            description: Set(record.description),
            cdn_prefix: Set(record.cdn_prefix),
            full_url: Set(record.full_url),
            remote_path: Set(record.remote_path),
            ..file_record::ActiveModel::new()
        };

        let file = file_model.insert(db).await?;
        Ok(file)
    }

    pub async fn get_file_by_id(
        db: &DatabaseConnection,
        id: i32,
    ) -> Result<Option<file_record::Model>> {
        let file = FileRecord::find_by_id(id).one(db).await?;
        Ok(file)
    }

    /// All records, newest first
    pub async fn list_all_files(db: &DatabaseConnection) -> Result<Vec<file_record::Model>> {
        let files = newest_first(FileRecord::find()).all(db).await?;
        Ok(files)
    }

    pub async fn list_files(db: &DatabaseConnection, page: u64, page_size: u64) -> Result<FilePage> {
        fetch_page(db, newest_first(FileRecord::find()), page, page_size).await
    }

    /// Substring match on the original name or the description, newest first
    pub async fn search_files(
        db: &DatabaseConnection,
        keyword: &str,
        page: u64,
        page_size: u64,
    ) -> Result<FilePage> {
        let query = FileRecord::find().filter(
            Condition::any()
                .add(file_record::Column::OriginalName.contains(keyword))
                .add(file_record::Column::Description.contains(keyword)),
        );

        fetch_page(db, newest_first(query), page, page_size).await
    }

    pub async fn update_description(
        db: &DatabaseConnection,
        id: i32,
        description: &str,
    ) -> Result<bool> {
        let result = FileRecord::update_many()
            .col_expr(file_record::Column::Description, Expr::value(description))
            .filter(file_record::Column::Id.eq(id))
            .exec(db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Single `download_count = download_count + 1` statement, safe under concurrent downloads
    pub async fn increment_download_count(db: &DatabaseConnection, id: i32) -> Result<bool> {
        let result = FileRecord::update_many()
            .col_expr(
                file_record::Column::DownloadCount,
                Expr::col(file_record::Column::DownloadCount).add(1),
            )
            .filter(file_record::Column::Id.eq(id))
            .exec(db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete_file_by_id(db: &DatabaseConnection, id: i32) -> Result<bool> {
        let result = FileRecord::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }

    fn newest_first(query: Select<FileRecord>) -> Select<FileRecord> {
        query
            .order_by_desc(file_record::Column::UploadedAt)
            .order_by_desc(file_record::Column::Id)
    }

    async fn fetch_page(
        db: &DatabaseConnection,
        query: Select<FileRecord>,
        page: u64,
        page_size: u64,
    ) -> Result<FilePage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);

        let paginator = query.paginate(db, page_size);
        let counts = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(FilePage {
            items,
            total: counts.number_of_items,
            page,
            page_size,
            total_pages: counts.number_of_pages,
        })
    }
}

// Helper functions for CDN prefix operations. Generic over the connection so
// the registry can run them inside a transaction.
pub mod cdn_prefix_ops {
    use super::*;
    use ftpcdn_entity::{cdn_prefix, prelude::*};
    use sea_orm::sea_query::Expr;
    use sea_orm::*;

    /// Validated, trimmed values of a prefix
    #[derive(Debug, Clone, PartialEq)]
    pub struct PrefixFields {
        pub name: String,
        pub prefix_url: String,
        pub description: Option<String>,
        pub is_default: bool,
        pub is_active: bool,
    }

    pub async fn create_prefix<C: ConnectionTrait>(
        db: &C,
        fields: PrefixFields,
    ) -> Result<cdn_prefix::Model> {
        let prefix_model = cdn_prefix::ActiveModel {
            name: Set(fields.name),
            prefix_url: Set(fields.prefix_url),
            description: Set(fields.description),
            is_default: Set(fields.is_default),
            is_active: Set(fields.is_active),
            ..cdn_prefix::ActiveModel::new()
        };

        let prefix = prefix_model.insert(db).await?;
        Ok(prefix)
    }

    pub async fn get_prefix_by_id<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<cdn_prefix::Model>> {
        let prefix = CdnPrefix::find_by_id(id).one(db).await?;
        Ok(prefix)
    }

    pub async fn update_prefix<C: ConnectionTrait>(
        db: &C,
        existing: cdn_prefix::Model,
        fields: PrefixFields,
    ) -> Result<cdn_prefix::Model> {
        let mut prefix: cdn_prefix::ActiveModel = existing.into();
        prefix.name = Set(fields.name);
        prefix.prefix_url = Set(fields.prefix_url);
        prefix.description = Set(fields.description);
        prefix.is_default = Set(fields.is_default);
        prefix.is_active = Set(fields.is_active);
        prefix.updated_at = Set(chrono::Utc::now());

        let prefix = prefix.update(db).await?;
        Ok(prefix)
    }

    /// Default first, then in creation order
    pub async fn list_prefixes<C: ConnectionTrait>(db: &C) -> Result<Vec<cdn_prefix::Model>> {
        let prefixes = selection_order(CdnPrefix::find()).all(db).await?;
        Ok(prefixes)
    }

    pub async fn list_active_prefixes<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<cdn_prefix::Model>> {
        let prefixes = selection_order(CdnPrefix::find())
            .filter(cdn_prefix::Column::IsActive.eq(true))
            .all(db)
            .await?;
        Ok(prefixes)
    }

    pub async fn get_default_prefix<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Option<cdn_prefix::Model>> {
        let prefix = CdnPrefix::find()
            .filter(cdn_prefix::Column::IsDefault.eq(true))
            .filter(cdn_prefix::Column::IsActive.eq(true))
            .order_by_asc(cdn_prefix::Column::Id)
            .one(db)
            .await?;
        Ok(prefix)
    }

    /// Unset the default flag on every row that has it
    pub async fn clear_all_default<C: ConnectionTrait>(db: &C) -> Result<u64> {
        let result = CdnPrefix::update_many()
            .col_expr(cdn_prefix::Column::IsDefault, Expr::value(false))
            .col_expr(cdn_prefix::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(cdn_prefix::Column::IsDefault.eq(true))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn set_default<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool> {
        let result = CdnPrefix::update_many()
            .col_expr(cdn_prefix::Column::IsDefault, Expr::value(true))
            .col_expr(cdn_prefix::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(cdn_prefix::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Serialize registry writers for the rest of the enclosing transaction.
    /// Plain reads are not blocked.
    pub async fn lock_registry<C: ConnectionTrait>(db: &C) -> Result<()> {
        match db.get_database_backend() {
            DbBackend::Postgres => {
                // Self-conflicting, so an empty table or a freshly inserted row is covered too
                db.execute_unprepared("LOCK TABLE cdn_prefixes IN SHARE ROW EXCLUSIVE MODE")
                    .await?;
            }
            DbBackend::Sqlite => {
                // Any write statement takes the database write lock up front
                db.execute_unprepared("UPDATE cdn_prefixes SET is_default = is_default WHERE 1 = 0")
                    .await?;
            }
            DbBackend::MySql => {
                CdnPrefix::find().lock_exclusive().all(db).await?;
            }
        }
        Ok(())
    }

    pub async fn delete_prefix_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool> {
        let result = CdnPrefix::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count_by_prefix_excluding_id<C: ConnectionTrait>(
        db: &C,
        prefix_url: &str,
        exclude_id: Option<i32>,
    ) -> Result<u64> {
        let query = CdnPrefix::find().filter(cdn_prefix::Column::PrefixUrl.eq(prefix_url));
        Ok(excluding(query, exclude_id).count(db).await?)
    }

    pub async fn count_by_name_excluding_id<C: ConnectionTrait>(
        db: &C,
        name: &str,
        exclude_id: Option<i32>,
    ) -> Result<u64> {
        let query = CdnPrefix::find().filter(cdn_prefix::Column::Name.eq(name));
        Ok(excluding(query, exclude_id).count(db).await?)
    }

    fn excluding(query: Select<CdnPrefix>, exclude_id: Option<i32>) -> Select<CdnPrefix> {
        match exclude_id {
            Some(id) => query.filter(cdn_prefix::Column::Id.ne(id)),
            None => query,
        }
    }

    fn selection_order(query: Select<CdnPrefix>) -> Select<CdnPrefix> {
        query
            .order_by_desc(cdn_prefix::Column::IsDefault)
            .order_by_asc(cdn_prefix::Column::CreatedAt)
            .order_by_asc(cdn_prefix::Column::Id)
    }
}
