//! Repository for the `users` table.

use clubhouse_core::membership::{ensure_dependent_slot, RELATIONSHIP_TITULAR};
use clubhouse_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::user::{CreateUser, UpdateUser, User, UserListParams};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, account_id, membership_id, relationship, first_name, \
                                   last_name, document_number, birth_date, email, phone, \
                                   address, is_active, created_at, updated_at";

/// Provides CRUD operations for users (club members and dependents).
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, input).await
    }

    /// Insert a dependent while holding the membership row lock.
    ///
    /// Returns `None` when the membership already has `max_dependents`
    /// active dependents.
    pub async fn create_dependent(
        pool: &PgPool,
        input: &CreateUser,
        membership_id: DbId,
        max_dependents: i32,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM memberships WHERE id = $1 FOR UPDATE")
            .bind(membership_id)
            .execute(&mut *tx)
            .await?;
        let current: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE membership_id = $1 AND relationship <> $2 AND is_active",
        )
        .bind(membership_id)
        .bind(RELATIONSHIP_TITULAR)
        .fetch_one(&mut *tx)
        .await?;
        if ensure_dependent_slot(current, max_dependents).is_err() {
            return Ok(None);
        }

        let user = Self::insert(&mut tx, input).await?;
        tx.commit().await?;
        Ok(Some(user))
    }

    async fn insert(conn: &mut PgConnection, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users
                (account_id, membership_id, relationship, first_name, last_name,
                 document_number, birth_date, email, phone, address)
             VALUES ($1, $2, COALESCE($3, $4), $5, $6, UPPER($7), $8, LOWER($9), $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.account_id)
            .bind(input.membership_id)
            .bind(&input.relationship)
            .bind(RELATIONSHIP_TITULAR)
            .bind(input.first_name.trim())
            .bind(input.last_name.trim())
            .bind(&input.document_number)
            .bind(input.birth_date)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the user linked to a login account.
    pub async fn find_by_account_id(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE account_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_document(
        pool: &PgPool,
        document_number: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE document_number = UPPER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(document_number)
            .fetch_optional(pool)
            .await
    }

    /// List users with optional membership and text filters.
    ///
    /// `search` matches first name, last name, or document number,
    /// case-insensitively.
    pub async fn list(
        pool: &PgPool,
        params: &UserListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let pattern = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE ($1::BIGINT IS NULL OR membership_id = $1)
               AND ($2::TEXT IS NULL
                    OR first_name ILIKE $2 OR last_name ILIKE $2 OR document_number ILIKE $2)
               AND ($3 OR is_active)
             ORDER BY last_name ASC, first_name ASC, id ASC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(params.membership_id)
            .bind(pattern)
            .bind(params.include_inactive)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// All users of a membership, titular first.
    pub async fn list_by_membership(
        pool: &PgPool,
        membership_id: DbId,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE membership_id = $1
             ORDER BY (relationship = $2) DESC, id ASC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(membership_id)
            .bind(RELATIONSHIP_TITULAR)
            .fetch_all(pool)
            .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                document_number = COALESCE(UPPER($4), document_number),
                birth_date = COALESCE($5, birth_date),
                email = COALESCE(LOWER($6), email),
                phone = COALESCE($7, phone),
                address = COALESCE($8, address),
                relationship = COALESCE($9, relationship),
                is_active = COALESCE($10, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(input.first_name.as_deref().map(str::trim))
            .bind(input.last_name.as_deref().map(str::trim))
            .bind(&input.document_number)
            .bind(input.birth_date)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.relationship)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deactivate a user. Returns `true` if the row was updated.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
