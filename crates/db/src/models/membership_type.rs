//! Membership type (fee plan) model and DTOs.

use clubhouse_core::types::{Cents, DbId, Timestamp};
use clubhouse_core::validation::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `membership_types` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MembershipType {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub monthly_fee_cents: Cents,
    pub admission_fee_cents: Cents,
    pub max_dependents: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a membership type.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMembershipType {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub monthly_fee_cents: Cents,
    #[validate(range(min = 0))]
    pub admission_fee_cents: Option<Cents>,
    #[validate(range(min = 0, max = 20))]
    pub max_dependents: Option<i32>,
}

/// DTO for updating a membership type. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMembershipType {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub monthly_fee_cents: Option<Cents>,
    #[validate(range(min = 0))]
    pub admission_fee_cents: Option<Cents>,
    #[validate(range(min = 0, max = 20))]
    pub max_dependents: Option<i32>,
    pub is_active: Option<bool>,
}
