//! User (person) model and DTOs.
//!
//! A user is a member of the club -- titular or dependent -- and may or may
//! not have a login [`Account`](crate::models::account::Account).

use chrono::NaiveDate;
use clubhouse_core::types::{DbId, Timestamp};
use clubhouse_core::validation::{validate_document_number, validate_not_blank, validate_phone};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub account_id: Option<DbId>,
    pub membership_id: Option<DbId>,
    pub relationship: String,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// DTO for creating a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    pub account_id: Option<DbId>,
    pub membership_id: Option<DbId>,
    /// Defaults to `titular` when omitted.
    pub relationship: Option<String>,
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub last_name: String,
    #[validate(custom(function = "validate_document_number"))]
    pub document_number: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
}

/// DTO for updating a user. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_document_number"))]
    pub document_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    pub relationship: Option<String>,
    pub is_active: Option<bool>,
}

/// Query filter for user listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    pub membership_id: Option<DbId>,
    /// Case-insensitive match on name or document number.
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
