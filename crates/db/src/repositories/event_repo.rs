//! Repository for the `events` table.

use clubhouse_core::status::EventStatus;
use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::{CreateEvent, Event, EventListParams, EventSummary, UpdateEvent};
use crate::repositories::BillRepo;

const COLUMNS: &str = "id, title, description, space_id, starts_at, ends_at, capacity, \
                        price_cents, status_id, created_by, created_at, updated_at";

/// Same columns qualified with the `e` alias, plus the inscription count.
const SUMMARY_COLUMNS: &str = "e.id, e.title, e.description, e.space_id, e.starts_at, \
                                e.ends_at, e.capacity, e.price_cents, e.status_id, \
                                e.created_by, e.created_at, e.updated_at, \
                                (SELECT COUNT(*) FROM event_inscriptions i \
                                  WHERE i.event_id = e.id) AS inscribed";

/// Provides persistence for club events.
pub struct EventRepo;

impl EventRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateEvent,
        created_by: DbId,
    ) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events
                (title, description, space_id, starts_at, ends_at, capacity, price_cents, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 0), $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.space_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.capacity)
            .bind(input.price_cents)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_summary(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<EventSummary>, sqlx::Error> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM events e WHERE e.id = $1");
        sqlx::query_as::<_, EventSummary>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List events by start time.
    pub async fn list(
        pool: &PgPool,
        params: &EventListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM events e
             WHERE (NOT $1 OR e.ends_at > NOW())
               AND ($2 OR e.status_id <> $3)
             ORDER BY e.starts_at ASC, e.id ASC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, EventSummary>(&query)
            .bind(params.upcoming)
            .bind(params.include_cancelled)
            .bind(EventStatus::Cancelled.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update an event. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEvent,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!(
            "UPDATE events SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                space_id = COALESCE($4, space_id),
                starts_at = COALESCE($5, starts_at),
                ends_at = COALESCE($6, ends_at),
                capacity = COALESCE($7, capacity),
                price_cents = COALESCE($8, price_cents)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.space_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.capacity)
            .bind(input.price_cents)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a scheduled event and every inscription bill in one transaction.
    ///
    /// Returns the cancelled event and the number of bills cancelled, or
    /// `None` if the event is missing or not scheduled.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        devolution_rate_percent: i32,
    ) -> Result<Option<(Event, u64)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE events SET status_id = $2
             WHERE id = $1 AND status_id = $3
             RETURNING {COLUMNS}"
        );
        let Some(event) = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(EventStatus::Cancelled.id())
            .bind(EventStatus::Scheduled.id())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let bill_ids: Vec<DbId> = sqlx::query_scalar(
            "SELECT bill_id FROM event_inscriptions WHERE event_id = $1 AND bill_id IS NOT NULL",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let mut cancelled = 0;
        for bill_id in bill_ids {
            if BillRepo::cancel_in_tx(&mut tx, bill_id, "Event cancelled", devolution_rate_percent)
                .await?
                .is_some()
            {
                cancelled += 1;
            }
        }

        tx.commit().await?;
        Ok(Some((event, cancelled)))
    }
}
