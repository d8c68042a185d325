//! Repository for the `spaces` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::space::{CreateSpace, Space, UpdateSpace};

const COLUMNS: &str = "id, name, description, capacity, price_per_hour_cents, opens_at, \
                        closes_at, is_active, created_at, updated_at";

/// Provides CRUD operations for bookable spaces.
pub struct SpaceRepo;

impl SpaceRepo {
    pub async fn create(pool: &PgPool, input: &CreateSpace) -> Result<Space, sqlx::Error> {
        let query = format!(
            "INSERT INTO spaces (name, description, capacity, price_per_hour_cents, opens_at, closes_at)
             VALUES ($1, $2, $3, COALESCE($4, 0), COALESCE($5, TIME '08:00'), COALESCE($6, TIME '22:00'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Space>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(input.capacity)
            .bind(input.price_per_hour_cents)
            .bind(input.opens_at)
            .bind(input.closes_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Space>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM spaces WHERE id = $1");
        sqlx::query_as::<_, Space>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Space>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM spaces WHERE ($1 OR is_active) ORDER BY name ASC"
        );
        sqlx::query_as::<_, Space>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Update a space. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSpace,
    ) -> Result<Option<Space>, sqlx::Error> {
        let query = format!(
            "UPDATE spaces SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                capacity = COALESCE($4, capacity),
                price_per_hour_cents = COALESCE($5, price_per_hour_cents),
                opens_at = COALESCE($6, opens_at),
                closes_at = COALESCE($7, closes_at),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Space>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.capacity)
            .bind(input.price_per_hour_cents)
            .bind(input.opens_at)
            .bind(input.closes_at)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE spaces SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
