use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, Response, StatusCode},
    response::{IntoResponse, Json},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{
    error::{AppError, Result},
    AppState, CdnPrefixInfo, CdnPrefixRequest, FileInfo, FileListQuery, FileListResponse,
    MessageResponse, UpdateDescriptionRequest,
};
use ftpcdn_entity::{cdn_prefix, file_record};

const DEFAULT_PAGE_SIZE: u64 = 10;

// RFC 5987 attr-chars that may stay unescaped in filename*
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ftpcdn-backend",
        "timestamp": chrono::Utc::now()
    }))
}

// File upload endpoint - multipart `file`, `description` and optional `cdn_prefix`
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileInfo>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut description = String::new();
    let mut cdn_prefix: Option<String> = None;

    // Process multipart form data
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                if filename.is_none() {
                    filename = field.file_name().map(str::to_string);
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read file data".to_string()))?;

                if data.len() > state.config.max_file_size {
                    return Err(AppError::PayloadTooLarge);
                }

                file_data = Some(data.to_vec());
            }
            "filename" => {
                let data = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read filename".to_string()))?;
                if !data.trim().is_empty() {
                    filename = Some(data.trim().to_string());
                }
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read description".to_string()))?;
            }
            "cdn_prefix" => {
                let data = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read CDN prefix".to_string()))?;
                if !data.trim().is_empty() {
                    cdn_prefix = Some(data.trim().to_string());
                }
            }
            _ => {
                // Skip unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    // Validate required fields
    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("Missing file data".to_string()))?;
    if file_data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    let filename = filename.ok_or_else(|| AppError::BadRequest("Missing filename".to_string()))?;

    let cdn_prefix = match cdn_prefix {
        Some(prefix) => prefix,
        None => state
            .registry
            .get_default()
            .await?
            .map(|prefix| prefix.prefix_url)
            .ok_or_else(|| {
                AppError::BadRequest(
                    "No CDN prefix given and no default prefix configured".to_string(),
                )
            })?,
    };

    let file = state
        .coordinator
        .upload(file_data, &filename, &description, &cdn_prefix)
        .await?;

    Ok(Json(file_info(file)))
}

// List or search files, newest first
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<FileListResponse>> {
    let page = query.page.unwrap_or(1);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);

    let result = match query.keyword.as_deref().map(str::trim) {
        Some(keyword) if !keyword.is_empty() => {
            state.coordinator.search_files(keyword, page, size).await?
        }
        _ => state.coordinator.list_files(page, size).await?,
    };

    Ok(Json(FileListResponse {
        files: result.items.into_iter().map(file_info).collect(),
        total: result.total,
        page: result.page,
        size: result.page_size,
        total_pages: result.total_pages,
    }))
}

pub async fn get_file_info(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FileInfo>> {
    let file = state.coordinator.get_file(id).await?;
    Ok(Json(file_info(file)))
}

pub async fn update_file_description(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateDescriptionRequest>,
) -> Result<Json<FileInfo>> {
    let file = state
        .coordinator
        .update_description(id, &request.description)
        .await?;
    Ok(Json(file_info(file)))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    state.coordinator.delete(id).await?;
    Ok(Json(MessageResponse {
        message: format!("File {} deleted", id),
    }))
}

// Download endpoint - streams the stored bytes back as an attachment
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response<Body>> {
    let (file, data) = state.coordinator.download(id).await?;

    let content_type = if file.has_extension() {
        mime_guess::from_path(&file.original_name)
            .first_or_octet_stream()
            .to_string()
    } else {
        "application/octet-stream".to_string()
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&file.original_name),
        )
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .body(Body::from(data))
        .map_err(|e| AppError::ServerError(format!("Failed to build download response: {}", e)))?;

    Ok(response)
}

pub async fn list_cdn_prefixes(State(state): State<AppState>) -> Result<Json<Vec<CdnPrefixInfo>>> {
    let prefixes = state.registry.list().await?;
    Ok(Json(prefixes.into_iter().map(prefix_info).collect()))
}

pub async fn list_active_cdn_prefixes(
    State(state): State<AppState>,
) -> Result<Json<Vec<CdnPrefixInfo>>> {
    let prefixes = state.registry.list_active().await?;
    Ok(Json(prefixes.into_iter().map(prefix_info).collect()))
}

// Returns JSON null when no default is configured
pub async fn get_default_cdn_prefix(
    State(state): State<AppState>,
) -> Result<Json<Option<CdnPrefixInfo>>> {
    let prefix = state.registry.get_default().await?;
    Ok(Json(prefix.map(prefix_info)))
}

pub async fn get_cdn_prefix(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CdnPrefixInfo>> {
    let prefix = state.registry.get(id).await?;
    Ok(Json(prefix_info(prefix)))
}

pub async fn add_cdn_prefix(
    State(state): State<AppState>,
    Json(request): Json<CdnPrefixRequest>,
) -> Result<(StatusCode, Json<CdnPrefixInfo>)> {
    let prefix = state.registry.add(&request).await?;
    Ok((StatusCode::CREATED, Json(prefix_info(prefix))))
}

pub async fn update_cdn_prefix(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CdnPrefixRequest>,
) -> Result<Json<CdnPrefixInfo>> {
    let prefix = state.registry.update(id, &request).await?;
    Ok(Json(prefix_info(prefix)))
}

pub async fn set_default_cdn_prefix(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CdnPrefixInfo>> {
    let prefix = state.registry.set_default(id).await?;
    Ok(Json(prefix_info(prefix)))
}

pub async fn delete_cdn_prefix(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    state.registry.delete(id).await?;
    Ok(Json(MessageResponse {
        message: format!("CDN prefix {} deleted", id),
    }))
}

fn file_info(file: file_record::Model) -> FileInfo {
    FileInfo {
        id: file.id,
        original_name: file.original_name,
        storage_name: file.storage_name,
        extension: file.extension,
        size_bytes: file.size_bytes,
        description: file.description,
        cdn_prefix: file.cdn_prefix,
        full_url: file.full_url,
        remote_path: file.remote_path,
        uploaded_at: file.uploaded_at,
        download_count: file.download_count,
    }
}

fn prefix_info(prefix: cdn_prefix::Model) -> CdnPrefixInfo {
    CdnPrefixInfo {
        id: prefix.id,
        name: prefix.name,
        prefix_url: prefix.prefix_url,
        description: prefix.description,
        is_default: prefix.is_default,
        is_active: prefix.is_active,
        created_at: prefix.created_at,
        updated_at: prefix.updated_at,
    }
}

/// `attachment` disposition with an ASCII fallback name and the exact name in `filename*`
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    let encoded = utf8_percent_encode(filename, FILENAME_ESCAPE);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_name, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, MemoryRemoteStore};
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "ftpcdn-test-boundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_content_disposition_value() {
        assert_eq!(
            content_disposition_value("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
        assert_eq!(
            content_disposition_value("季度 报告.pdf"),
            "attachment; filename=\".pdf\"; filename*=UTF-8''%E5%AD%A3%E5%BA%A6%20%E6%8A%A5%E5%91%8A.pdf"
        );
        assert_eq!(
            content_disposition_value("报告"),
            "attachment; filename=\"download\"; filename*=UTF-8''%E6%8A%A5%E5%91%8A"
        );
    }

    #[tokio::test]
    async fn test_upload_download_and_delete_over_http() {
        let remote = Arc::new(MemoryRemoteStore::new("/uploads"));
        let app = crate::create_app(test_state(remote.clone()).await);

        let response = app
            .clone()
            .oneshot(upload_request(&[
                ("file", Some("report.pdf"), b"%PDF-1.7"),
                ("description", None, b"Q1 report"),
                ("cdn_prefix", None, b"https://cdn.example.com/"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded: FileInfo = read_json(response).await;
        assert_eq!(uploaded.description, "Q1 report");
        assert!(uploaded
            .full_url
            .starts_with("https://cdn.example.com/"));
        assert!(!uploaded.full_url["https://".len()..].contains("//"));

        let response = app
            .clone()
            .oneshot(empty_request(
                "GET",
                &format!("/api/files/{}/download", uploaded.id),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.7");

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/files/{}", uploaded.id)))
            .await
            .unwrap();
        let info: FileInfo = read_json(response).await;
        assert_eq!(info.download_count, 1);

        remote.fail_remove(true);
        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/api/files/{}", uploaded.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("GET", &format!("/api/files/{}", uploaded.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_uses_default_prefix() {
        let remote = Arc::new(MemoryRemoteStore::new("/uploads"));
        let app = crate::create_app(test_state(remote).await);

        let response = app
            .clone()
            .oneshot(upload_request(&[("file", Some("a.txt"), b"hello")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/cdn-prefixes",
                serde_json::json!({
                    "name": "main",
                    "prefix_url": "https://static.example.com",
                    "is_default": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(upload_request(&[("file", Some("a.txt"), b"hello")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded: FileInfo = read_json(response).await;
        assert_eq!(uploaded.cdn_prefix, "https://static.example.com");
        assert_eq!(
            uploaded.full_url,
            format!("https://static.example.com/{}", uploaded.storage_name)
        );
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let remote = Arc::new(MemoryRemoteStore::new("/uploads"));
        let mut state = test_state(remote.clone()).await;
        state.config.max_file_size = 4;
        let app = crate::create_app(state);

        let response = app
            .oneshot(upload_request(&[
                ("file", Some("big.bin"), b"0123456789"),
                ("cdn_prefix", None, b"https://cdn.example.com"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(remote.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_maps_to_bad_gateway() {
        let remote = Arc::new(MemoryRemoteStore::new("/uploads"));
        remote.fail_store(true);
        let app = crate::create_app(test_state(remote).await);

        let response = app
            .oneshot(upload_request(&[
                ("file", Some("a.txt"), b"hello"),
                ("cdn_prefix", None, b"https://cdn.example.com"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_file_listing_and_description_update() {
        let remote = Arc::new(MemoryRemoteStore::new("/uploads"));
        let app = crate::create_app(test_state(remote).await);

        for name in ["alpha.txt", "beta.txt", "gamma.txt"] {
            let response = app
                .clone()
                .oneshot(upload_request(&[
                    ("file", Some(name), b"data"),
                    ("cdn_prefix", None, b"https://cdn.example.com"),
                ]))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/files?page=1&size=2"))
            .await
            .unwrap();
        let listing: FileListResponse = read_json(response).await;
        assert_eq!(listing.total, 3);
        assert_eq!(listing.files.len(), 2);
        assert_eq!(listing.total_pages, 2);

        let id = listing.files[0].id;
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/files/{}/description", id),
                serde_json::json!({ "description": "findme" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("GET", "/api/files?keyword=findme"))
            .await
            .unwrap();
        let found: FileListResponse = read_json(response).await;
        assert_eq!(found.total, 1);
        assert_eq!(found.files[0].id, id);
    }

    #[tokio::test]
    async fn test_cdn_prefix_endpoints() {
        let remote = Arc::new(MemoryRemoteStore::new("/uploads"));
        let app = crate::create_app(test_state(remote).await);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/cdn-prefixes/default"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let none: Option<CdnPrefixInfo> = read_json(response).await;
        assert!(none.is_none());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/cdn-prefixes",
                serde_json::json!({ "name": "bad", "prefix_url": "cdn.example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut ids = Vec::new();
        for (name, url) in [("one", "https://1.example.com"), ("two", "https://2.example.com")] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/api/cdn-prefixes",
                    serde_json::json!({ "name": name, "prefix_url": url }),
                ))
                .await
                .unwrap();
            let created: CdnPrefixInfo = read_json(response).await;
            ids.push(created.id);
        }

        let response = app
            .clone()
            .oneshot(empty_request(
                "POST",
                &format!("/api/cdn-prefixes/{}/default", ids[1]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/cdn-prefixes/active"))
            .await
            .unwrap();
        let active: Vec<CdnPrefixInfo> = read_json(response).await;
        assert_eq!(active.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[1], ids[0]]);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/cdn-prefixes/{}", ids[0]),
                serde_json::json!({
                    "name": "one",
                    "prefix_url": "https://1.example.com",
                    "is_active": false
                }),
            ))
            .await
            .unwrap();
        let updated: CdnPrefixInfo = read_json(response).await;
        assert!(!updated.is_active);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/api/cdn-prefixes/{}", ids[1])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/cdn-prefixes/{}", ids[1])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(empty_request("GET", "/api/cdn-prefixes"))
            .await
            .unwrap();
        let all: Vec<CdnPrefixInfo> = read_json(response).await;
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_default);
    }
}
