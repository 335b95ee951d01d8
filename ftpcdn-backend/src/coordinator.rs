use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::database::file_ops::{self, NewFileRecord};
use crate::database::FilePage;
use crate::error::{AppError, Result};
use crate::naming;
use crate::remote::RemoteStore;
use ftpcdn_entity::file_record;

/// Keeps the remote store and the file catalog in step.
///
/// The remote store is written before the catalog on upload and cleaned
/// before the catalog on delete. Neither direction is compensated: an upload
/// whose catalog insert fails leaves an orphan blob behind, and a delete whose
/// remote removal fails still drops the catalog row.
#[derive(Clone)]
pub struct BlobCoordinator {
    db: DatabaseConnection,
    remote: Arc<dyn RemoteStore>,
}

impl BlobCoordinator {
    pub fn new(db: DatabaseConnection, remote: Arc<dyn RemoteStore>) -> Self {
        Self { db, remote }
    }

    /// Store `payload` remotely, then record it in the catalog.
    /// The caller enforces the size ceiling.
    pub async fn upload(
        &self,
        payload: Vec<u8>,
        original_name: &str,
        description: &str,
        prefix: &str,
    ) -> Result<file_record::Model> {
        if payload.is_empty() {
            return Err(AppError::InvalidArgument("payload is empty".to_string()));
        }
        if prefix.trim().is_empty() {
            return Err(AppError::InvalidArgument("CDN prefix is blank".to_string()));
        }

        let extension = naming::file_extension(original_name).to_string();
        let storage_name = naming::generate_storage_name(&extension);
        let size_bytes = payload.len() as i64;

        self.remote
            .store(payload, &storage_name)
            .await
            .map_err(|e| AppError::RemoteWriteFailed(format!("{}: {}", storage_name, e)))?;

        let full_url = naming::build_full_url(prefix, &storage_name);
        let remote_path = naming::build_remote_path(self.remote.base_path(), &storage_name);

        let record = NewFileRecord {
            original_name: original_name.to_string(),
            storage_name: storage_name.clone(),
            extension,
            size_bytes,
            description: description.to_string(),
            cdn_prefix: prefix.to_string(),
            full_url,
            remote_path: remote_path.clone(),
        };

        let file = match file_ops::create_file_record(&self.db, record).await {
            Ok(file) => file,
            Err(e) => {
                // The blob stays on the remote store for reconciliation
                tracing::error!(
                    storage_name = %storage_name,
                    remote_path = %remote_path,
                    "Orphaned remote file after catalog insert failed: {}",
                    e
                );
                return Err(AppError::MetadataWriteFailed {
                    storage_name,
                    reason: e.to_string(),
                });
            }
        };

        tracing::info!(
            "📁 File uploaded: {} -> {} ({} bytes)",
            file.original_name,
            file.full_url,
            file.size_bytes
        );

        Ok(file)
    }

    /// Fetch the bytes of a file and count the download once they are in hand
    pub async fn download(&self, id: i32) -> Result<(file_record::Model, Vec<u8>)> {
        let file = self.get_file(id).await?;

        let data = self
            .remote
            .fetch(&file.storage_name)
            .await
            .map_err(|e| AppError::RemoteReadFailed(format!("{}: {}", file.storage_name, e)))?;

        if let Err(e) = file_ops::increment_download_count(&self.db, id).await {
            tracing::warn!("Failed to count download of file {}: {}", id, e);
        }

        tracing::info!(
            "📥 File downloaded: {} ({} bytes)",
            file.storage_name,
            data.len()
        );

        Ok((file, data))
    }

    /// Remove the remote blob if possible, then always remove the catalog row
    pub async fn delete(&self, id: i32) -> Result<()> {
        let file = self.get_file(id).await?;

        if let Err(e) = self.remote.remove(&file.storage_name).await {
            let err = AppError::RemoteDeleteFailed(format!("{}: {}", file.storage_name, e));
            tracing::warn!(
                remote_path = %file.remote_path,
                "Continuing with catalog delete: {}",
                err
            );
        }

        let deleted = file_ops::delete_file_by_id(&self.db, id)
            .await
            .map_err(|e| AppError::MetadataDeleteFailed(format!("file {}: {}", id, e)))?;
        if !deleted {
            // Removed concurrently between lookup and delete
            return Err(AppError::NotFound);
        }

        tracing::info!("🗑️  File deleted: {} ({})", file.original_name, file.storage_name);
        Ok(())
    }

    pub async fn get_file(&self, id: i32) -> Result<file_record::Model> {
        file_ops::get_file_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update_description(
        &self,
        id: i32,
        description: &str,
    ) -> Result<file_record::Model> {
        if !file_ops::update_description(&self.db, id, description).await? {
            return Err(AppError::NotFound);
        }
        self.get_file(id).await
    }

    pub async fn list_files(&self, page: u64, page_size: u64) -> Result<FilePage> {
        file_ops::list_files(&self.db, page, page_size).await
    }

    pub async fn search_files(&self, keyword: &str, page: u64, page_size: u64) -> Result<FilePage> {
        file_ops::search_files(&self.db, keyword, page, page_size).await
    }
}
