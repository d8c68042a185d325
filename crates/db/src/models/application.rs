//! Membership application and recommendation models (with DTOs).

use chrono::NaiveDate;
use clubhouse_core::status::StatusId;
use clubhouse_core::types::{DbId, Timestamp};
use clubhouse_core::validation::{validate_document_number, validate_not_blank, validate_phone};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `membership_applications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MembershipApplication {
    pub id: DbId,
    pub membership_type_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub birth_date: Option<NaiveDate>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status_id: StatusId,
    pub reviewed_by: Option<DbId>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub membership_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `recommendation_members` table, joined with the
/// recommender's name for display.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecommendationMember {
    pub id: DbId,
    pub application_id: DbId,
    pub recommender_user_id: DbId,
    pub recommender_membership_id: DbId,
    pub recommender_name: String,
    pub created_at: Timestamp,
}

/// Application with its recommendations, for detail views.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: MembershipApplication,
    pub recommendations: Vec<RecommendationMember>,
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for submitting a membership application.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApplication {
    pub membership_type_id: DbId,
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub last_name: String,
    #[validate(custom(function = "validate_document_number"))]
    pub document_number: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    /// User ids of the sponsoring members.
    pub recommender_user_ids: Vec<DbId>,
}

/// A validated recommender ready to be stored with its membership.
#[derive(Debug, Clone, Copy)]
pub struct NewRecommendation {
    pub user_id: DbId,
    pub membership_id: DbId,
}

/// Query filter for application listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationListParams {
    pub status_id: Option<StatusId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
