//! Uploaded file metadata model.

use clubhouse_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `stored_files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredFile {
    pub id: DbId,
    pub owner_account_id: DbId,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub created_at: Timestamp,
}

/// DTO for recording an uploaded file.
#[derive(Debug, Clone)]
pub struct CreateStoredFile {
    pub owner_account_id: DbId,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
}
