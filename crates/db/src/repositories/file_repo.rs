//! Repository for the `stored_files` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::stored_file::{CreateStoredFile, StoredFile};

const COLUMNS: &str =
    "id, owner_account_id, original_name, content_type, size_bytes, storage_key, created_at";

/// Provides metadata persistence for uploaded files.
pub struct FileRepo;

impl FileRepo {
    pub async fn create(pool: &PgPool, input: &CreateStoredFile) -> Result<StoredFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO stored_files (owner_account_id, original_name, content_type, size_bytes, storage_key)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(input.owner_account_id)
            .bind(&input.original_name)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(&input.storage_key)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<StoredFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stored_files WHERE id = $1");
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List files, newest first. `owner` restricts to one account.
    pub async fn list(
        pool: &PgPool,
        owner: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stored_files
             WHERE ($1::BIGINT IS NULL OR owner_account_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(owner)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete a file row, returning it so the caller can remove the bytes.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<StoredFile>, sqlx::Error> {
        let query = format!("DELETE FROM stored_files WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
