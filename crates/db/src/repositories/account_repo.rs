//! Repository for the `accounts` table.

use clubhouse_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::account::{Account, AccountResponse, CreateAccount, UpdateAccount};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, password_hash, role_id, is_active, \
                        last_login_at, failed_login_count, locked_until, created_at, updated_at";

/// Public columns joined with the role name, for [`AccountResponse`].
const RESPONSE_COLUMNS: &str = "a.id, a.email, r.name AS role, a.role_id, a.is_active, \
                                 a.last_login_at, a.created_at";

/// Provides CRUD and login bookkeeping for accounts.
pub struct AccountRepo;

impl AccountRepo {
    /// Insert a new account, linking it to `input.user_id` when given.
    ///
    /// Both writes share one transaction; a missing or already linked user
    /// rolls the account back and yields `Ok(None)`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAccount,
    ) -> Result<Option<Account>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO accounts (email, password_hash, role_id)
             VALUES (LOWER($1), $2, $3)
             RETURNING {COLUMNS}"
        );
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(input.role_id)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(user_id) = input.user_id {
            let linked = sqlx::query(
                "UPDATE users SET account_id = $2 WHERE id = $1 AND account_id IS NULL",
            )
            .bind(user_id)
            .bind(account.id)
            .execute(&mut *tx)
            .await?;
            if linked.rows_affected() == 0 {
                return Ok(None);
            }
        }

        tx.commit().await?;
        Ok(Some(account))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an account by email. Emails are stored lower-cased.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE email = LOWER($1)");
        sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Public view of one account.
    pub async fn find_response(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AccountResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {RESPONSE_COLUMNS} FROM accounts a
             JOIN roles r ON r.id = a.role_id
             WHERE a.id = $1"
        );
        sqlx::query_as::<_, AccountResponse>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List accounts, newest first.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AccountResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {RESPONSE_COLUMNS} FROM accounts a
             JOIN roles r ON r.id = a.role_id
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, AccountResponse>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update an account. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAccount,
    ) -> Result<Option<Account>, sqlx::Error> {
        let query = format!(
            "UPDATE accounts SET
                email = COALESCE(LOWER($2), email),
                role_id = COALESCE($3, role_id),
                is_active = COALESCE($4, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(&input.email)
            .bind(input.role_id)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deactivate an account. Returns `true` if the row was updated.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE accounts SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count a failed login and lock the account once `max_attempts` is hit.
    ///
    /// A lock that has already expired starts a fresh count. Returns the
    /// failure count after this attempt.
    pub async fn record_failed_login(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
        lock_until: Timestamp,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "WITH next AS (
                SELECT id,
                       CASE WHEN locked_until IS NOT NULL AND locked_until <= NOW() THEN 1
                            ELSE failed_login_count + 1
                       END AS failures
                FROM accounts WHERE id = $1
                FOR UPDATE
             )
             UPDATE accounts a SET
                failed_login_count = next.failures,
                locked_until = CASE WHEN next.failures >= $2 THEN $3 ELSE NULL END
             FROM next
             WHERE a.id = next.id
             RETURNING a.failed_login_count",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_one(pool)
        .await
    }

    /// Reset the failure counter, clear any lock, and stamp `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and clear any lockout.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, failed_login_count = 0, locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
