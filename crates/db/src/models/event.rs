//! Club event and event inscription models and DTOs.

use clubhouse_core::status::StatusId;
use clubhouse_core::types::{Cents, DbId, Timestamp};
use clubhouse_core::validation::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub space_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub capacity: i32,
    pub price_cents: Cents,
    pub status_id: StatusId,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Event with its current inscription count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub inscribed: i64,
}

/// A row from the `event_inscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventInscription {
    pub id: DbId,
    pub event_id: DbId,
    pub user_id: DbId,
    pub membership_id: DbId,
    pub bill_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for creating an event.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEvent {
    #[validate(length(min = 1, max = 200), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub space_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    #[validate(range(min = 1, max = 100000))]
    pub capacity: i32,
    #[validate(range(min = 0))]
    pub price_cents: Option<Cents>,
}

/// DTO for updating an event. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEvent {
    #[validate(length(min = 1, max = 200), custom(function = "validate_not_blank"))]
    pub title: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub space_id: Option<DbId>,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    #[validate(range(min = 1, max = 100000))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0))]
    pub price_cents: Option<Cents>,
}

/// Query filter for event listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListParams {
    /// Only events that have not ended yet.
    #[serde(default)]
    pub upcoming: bool,
    #[serde(default)]
    pub include_cancelled: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
