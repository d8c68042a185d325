//! Repository for the `membership_types` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::membership_type::{
    CreateMembershipType, MembershipType, UpdateMembershipType,
};

const COLUMNS: &str = "id, name, description, monthly_fee_cents, admission_fee_cents, \
                        max_dependents, is_active, created_at, updated_at";

/// Provides CRUD operations for membership types.
pub struct MembershipTypeRepo;

impl MembershipTypeRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateMembershipType,
    ) -> Result<MembershipType, sqlx::Error> {
        let query = format!(
            "INSERT INTO membership_types
                (name, description, monthly_fee_cents, admission_fee_cents, max_dependents)
             VALUES ($1, $2, $3, COALESCE($4, 0), COALESCE($5, 4))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MembershipType>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(input.monthly_fee_cents)
            .bind(input.admission_fee_cents)
            .bind(input.max_dependents)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MembershipType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM membership_types WHERE id = $1");
        sqlx::query_as::<_, MembershipType>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List membership types by name. Inactive types only when asked.
    pub async fn list(
        pool: &PgPool,
        include_inactive: bool,
    ) -> Result<Vec<MembershipType>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM membership_types
             WHERE ($1 OR is_active)
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, MembershipType>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Update a membership type. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMembershipType,
    ) -> Result<Option<MembershipType>, sqlx::Error> {
        let query = format!(
            "UPDATE membership_types SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                monthly_fee_cents = COALESCE($4, monthly_fee_cents),
                admission_fee_cents = COALESCE($5, admission_fee_cents),
                max_dependents = COALESCE($6, max_dependents),
                is_active = COALESCE($7, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MembershipType>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.monthly_fee_cents)
            .bind(input.admission_fee_cents)
            .bind(input.max_dependents)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deactivate a membership type. Returns `true` if the row was updated.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE membership_types SET is_active = false WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
