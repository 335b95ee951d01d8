use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "file_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,

    /// Name the file was uploaded with
    pub original_name: String,

    /// Generated key of the object on the remote store
    pub storage_name: String,

    /// Extension of the original name including the dot, empty if there is none
    pub extension: String,

    /// Payload size in bytes at upload time
    pub size_bytes: i64,

    pub description: String,

    /// CDN prefix used when the file was uploaded. Copied, not referenced.
    pub cdn_prefix: String,

    /// Public URL, fixed at upload time
    pub full_url: String,

    /// Directory and storage name on the remote store
    pub remote_path: String,

    pub uploaded_at: ChronoDateTimeUtc,

    #[sea_orm(default_value = 0)]
    pub download_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            uploaded_at: Set(chrono::Utc::now()),
            download_count: Set(0),
            ..ActiveModelTrait::default()
        }
    }
}

impl Model {
    /// Whether the original name carried an extension
    pub fn has_extension(&self) -> bool {
        !self.extension.is_empty()
    }
}
