//! Member change request model and DTOs.

use chrono::NaiveDate;
use clubhouse_core::status::StatusId;
use clubhouse_core::types::{Cents, DbId, Timestamp};
use clubhouse_core::validation::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `member_change_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberChangeRequest {
    pub id: DbId,
    pub membership_id: DbId,
    pub requested_by: DbId,
    pub kind: String,
    pub reason: String,
    pub suspend_until: Option<NaiveDate>,
    pub status_id: StatusId,
    pub reviewed_by: Option<DbId>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub devolution_cents: Cents,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for filing a change request.
///
/// `membership_id` is optional for members (defaults to their own).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChangeRequest {
    pub membership_id: Option<DbId>,
    pub kind: String,
    #[validate(length(min = 1, max = 1000), custom(function = "validate_not_blank"))]
    pub reason: String,
    pub suspend_until: Option<NaiveDate>,
}

/// Query filter for change request listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeRequestListParams {
    pub membership_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
