use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::database::cdn_prefix_ops::{self, PrefixFields};
use crate::error::{AppError, Result};
use crate::CdnPrefixRequest;
use ftpcdn_entity::cdn_prefix;

/// Named CDN prefixes with at most one default.
///
/// Every write takes the registry lock, then clears and sets the default flag
/// in the same transaction. Concurrent writers run one after another, so the
/// last committer's default is the only one left.
#[derive(Clone)]
pub struct CdnPrefixRegistry {
    db: DatabaseConnection,
}

impl CdnPrefixRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn add(&self, request: &CdnPrefixRequest) -> Result<cdn_prefix::Model> {
        let fields = validate(request)?;

        let txn = self.db.begin().await?;
        cdn_prefix_ops::lock_registry(&txn).await?;
        ensure_unique(&txn, &fields, None).await?;
        if fields.is_default {
            cdn_prefix_ops::clear_all_default(&txn).await?;
        }
        let prefix = cdn_prefix_ops::create_prefix(&txn, fields).await?;
        txn.commit().await?;

        tracing::info!("🌐 CDN prefix added: {} -> {}", prefix.name, prefix.prefix_url);
        Ok(prefix)
    }

    pub async fn update(&self, id: i32, request: &CdnPrefixRequest) -> Result<cdn_prefix::Model> {
        let fields = validate(request)?;

        let txn = self.db.begin().await?;
        cdn_prefix_ops::lock_registry(&txn).await?;
        let existing = cdn_prefix_ops::get_prefix_by_id(&txn, id)
            .await?
            .ok_or(AppError::NotFound)?;
        ensure_unique(&txn, &fields, Some(id)).await?;
        if fields.is_default {
            cdn_prefix_ops::clear_all_default(&txn).await?;
        }
        let prefix = cdn_prefix_ops::update_prefix(&txn, existing, fields).await?;
        txn.commit().await?;

        tracing::info!("🌐 CDN prefix updated: {} -> {}", prefix.name, prefix.prefix_url);
        Ok(prefix)
    }

    pub async fn set_default(&self, id: i32) -> Result<cdn_prefix::Model> {
        let txn = self.db.begin().await?;
        cdn_prefix_ops::lock_registry(&txn).await?;
        if cdn_prefix_ops::get_prefix_by_id(&txn, id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        cdn_prefix_ops::clear_all_default(&txn).await?;
        cdn_prefix_ops::set_default(&txn, id).await?;
        let prefix = cdn_prefix_ops::get_prefix_by_id(&txn, id)
            .await?
            .ok_or(AppError::NotFound)?;
        txn.commit().await?;

        tracing::info!("⭐ Default CDN prefix is now: {}", prefix.name);
        Ok(prefix)
    }

    /// Files uploaded under the prefix keep their URLs
    pub async fn delete(&self, id: i32) -> Result<()> {
        if !cdn_prefix_ops::delete_prefix_by_id(&self.db, id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!("🗑️  CDN prefix deleted: {}", id);
        Ok(())
    }

    pub async fn get(&self, id: i32) -> Result<cdn_prefix::Model> {
        cdn_prefix_ops::get_prefix_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// The active default prefix. `None` is a valid answer.
    pub async fn get_default(&self) -> Result<Option<cdn_prefix::Model>> {
        cdn_prefix_ops::get_default_prefix(&self.db).await
    }

    pub async fn list(&self) -> Result<Vec<cdn_prefix::Model>> {
        cdn_prefix_ops::list_prefixes(&self.db).await
    }

    pub async fn list_active(&self) -> Result<Vec<cdn_prefix::Model>> {
        cdn_prefix_ops::list_active_prefixes(&self.db).await
    }
}

/// Trim and check a request without touching the catalog
fn validate(request: &CdnPrefixRequest) -> Result<PrefixFields> {
    let name = request.name.trim();
    let prefix_url = request.prefix_url.trim();

    if name.is_empty() {
        return Err(AppError::InvalidArgument(
            "prefix name must not be blank".to_string(),
        ));
    }
    if prefix_url.is_empty() {
        return Err(AppError::InvalidArgument(
            "prefix URL must not be blank".to_string(),
        ));
    }
    if !prefix_url.starts_with("http://") && !prefix_url.starts_with("https://") {
        return Err(AppError::InvalidArgument(
            "prefix URL must start with http:// or https://".to_string(),
        ));
    }

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(PrefixFields {
        name: name.to_string(),
        prefix_url: prefix_url.to_string(),
        description,
        is_default: request.is_default,
        is_active: request.is_active,
    })
}

async fn ensure_unique(
    txn: &DatabaseTransaction,
    fields: &PrefixFields,
    exclude_id: Option<i32>,
) -> Result<()> {
    if cdn_prefix_ops::count_by_name_excluding_id(txn, &fields.name, exclude_id).await? > 0 {
        return Err(AppError::InvalidArgument(format!(
            "prefix name already exists: {}",
            fields.name
        )));
    }
    if cdn_prefix_ops::count_by_prefix_excluding_id(txn, &fields.prefix_url, exclude_id).await?
        > 0
    {
        return Err(AppError::InvalidArgument(format!(
            "prefix URL already exists: {}",
            fields.prefix_url
        )));
    }
    Ok(())
}
