//! Membership model and DTOs.

use chrono::NaiveDate;
use clubhouse_core::status::StatusId;
use clubhouse_core::types::{Cents, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::User;

/// A row from the `memberships` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Membership {
    pub id: DbId,
    pub code: String,
    pub membership_type_id: DbId,
    pub state_id: StatusId,
    pub started_on: NaiveDate,
    pub suspended_until: Option<NaiveDate>,
    pub state_reason: Option<String>,
    pub discount_percent: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Membership enriched with its members, for detail views.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipDetail {
    #[serde(flatten)]
    pub membership: Membership,
    pub membership_type_name: String,
    pub members: Vec<User>,
}

/// DTO for updating a membership's plan or discount.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMembership {
    pub membership_type_id: Option<DbId>,
    #[validate(range(min = 0, max = 100))]
    pub discount_percent: Option<i32>,
}

/// Query filter for membership listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipListParams {
    pub state_id: Option<StatusId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Payment position of a membership.
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatus {
    pub membership_id: DbId,
    pub pending_cents: Cents,
    pub pending_bills: i64,
    pub overdue_cents: Cents,
    pub overdue_bills: i64,
    pub delinquent: bool,
}

/// Billable membership row used by the monthly generation run.
#[derive(Debug, Clone, FromRow)]
pub struct BillableMembership {
    pub id: DbId,
    pub code: String,
    pub state_id: StatusId,
    pub discount_percent: i32,
    pub monthly_fee_cents: Cents,
    pub membership_type_name: String,
}
