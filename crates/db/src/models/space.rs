//! Bookable space model and DTOs.

use chrono::NaiveTime;
use clubhouse_core::types::{Cents, DbId, Timestamp};
use clubhouse_core::validation::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `spaces` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Space {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub price_per_hour_cents: Cents,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a space.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSpace {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: i32,
    #[validate(range(min = 0))]
    pub price_per_hour_cents: Option<Cents>,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
}

/// DTO for updating a space. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSpace {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0))]
    pub price_per_hour_cents: Option<Cents>,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
    pub is_active: Option<bool>,
}
