//! Handlers for the `/files` resource (uploaded documents).

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::models::stored_file::{CreateStoredFile, StoredFile};
use clubhouse_db::repositories::FileRepo;
use clubhouse_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// POST /api/v1/files
///
/// Accepts a multipart form with a required `file` field.
pub async fn upload_file(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<StoredFile>>)> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((filename, content_type, data.to_vec()));
    }

    let (filename, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::BadRequest(format!(
            "File exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        )));
    }

    let storage_key = state.storage.put(&data).await?;

    let input = CreateStoredFile {
        owner_account_id: auth.account_id,
        original_name: filename,
        content_type,
        size_bytes: data.len() as i64,
        storage_key: storage_key.clone(),
    };
    let stored = match FileRepo::create(&state.pool, &input).await {
        Ok(stored) => stored,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&storage_key).await {
                tracing::warn!(key = %storage_key, error = %cleanup, "Orphaned upload not removed");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        file_id = stored.id,
        size_bytes = stored.size_bytes,
        owner = auth.account_id,
        "File uploaded"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: stored })))
}

/// GET /api/v1/files
///
/// Own files; staff see all.
pub async fn list_files(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<StoredFile>>>> {
    let (limit, offset) = params.resolve();
    let owner = (!auth.is_staff()).then_some(auth.account_id);
    let files = FileRepo::list(&state.pool, owner, limit, offset).await?;
    Ok(Json(DataResponse { data: files }))
}

/// GET /api/v1/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<StoredFile>>> {
    let file = find_accessible(&state.pool, &auth, id).await?;
    Ok(Json(DataResponse { data: file }))
}

/// GET /api/v1/files/{id}/content
pub async fn download_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let file = find_accessible(&state.pool, &auth, id).await?;
    let bytes = state.storage.get(&file.storage_key).await?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        file.original_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /api/v1/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_accessible(&state.pool, &auth, id).await?;

    let removed = FileRepo::delete(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "File", id }))?;

    if let Err(e) = state.storage.delete(&removed.storage_key).await {
        tracing::warn!(file_id = id, error = %e, "Stored object not removed");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn find_accessible(pool: &DbPool, auth: &AuthUser, id: DbId) -> AppResult<StoredFile> {
    let file = FileRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "File", id }))?;
    if !auth.is_staff() && file.owner_account_id != auth.account_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this file".into(),
        )));
    }
    Ok(file)
}
