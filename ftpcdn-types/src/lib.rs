use serde::{Deserialize, Serialize};

// Request types
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FileListQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub keyword: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpdateDescriptionRequest {
    pub description: String,
}

/// Body of both the add and the update CDN prefix calls
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CdnPrefixRequest {
    pub name: String,
    pub prefix_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

// Response types
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct FileInfo {
    pub id: i32,
    pub original_name: String,
    pub storage_name: String,
    pub extension: String,
    pub size_bytes: i64,
    pub description: String,
    pub cdn_prefix: String,
    pub full_url: String,
    pub remote_path: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub download_count: i32,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct CdnPrefixInfo {
    pub id: i32,
    pub name: String,
    pub prefix_url: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FileListResponse {
    pub files: Vec<FileInfo>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
    pub total_pages: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}
