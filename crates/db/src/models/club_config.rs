//! Club configuration (single row) model and DTO.

use clubhouse_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// The single row of the `club_config` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClubConfig {
    pub club_name: String,
    pub due_day_of_month: i32,
    pub mora_rate_percent: i32,
    pub devolution_rate_percent: i32,
    pub suspended_fee_percent: i32,
    pub min_recommender_months: i32,
    pub delinquency_threshold: i32,
    pub reservation_cancel_hours: i32,
    pub max_reservation_hours: i32,
    pub updated_at: Timestamp,
}

/// DTO for updating club configuration. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateClubConfig {
    #[validate(length(min = 1, max = 200))]
    pub club_name: Option<String>,
    #[validate(range(min = 1, max = 31))]
    pub due_day_of_month: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub mora_rate_percent: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub devolution_rate_percent: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub suspended_fee_percent: Option<i32>,
    #[validate(range(min = 0, max = 600))]
    pub min_recommender_months: Option<i32>,
    #[validate(range(min = 0, max = 120))]
    pub delinquency_threshold: Option<i32>,
    #[validate(range(min = 0, max = 720))]
    pub reservation_cancel_hours: Option<i32>,
    #[validate(range(min = 0, max = 24))]
    pub max_reservation_hours: Option<i32>,
}
