//! Bill and bill detail models and DTOs.

use chrono::NaiveDate;
use clubhouse_core::status::StatusId;
use clubhouse_core::types::{Cents, DbId, Timestamp};
use clubhouse_core::validation::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `bills` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Bill {
    pub id: DbId,
    pub membership_id: DbId,
    pub kind: String,
    pub period: Option<NaiveDate>,
    pub issued_on: NaiveDate,
    pub due_date: NaiveDate,
    pub status_id: StatusId,
    pub subtotal_cents: Cents,
    pub discount_cents: Cents,
    pub mora_cents: Cents,
    pub total_cents: Cents,
    pub devolution_cents: Cents,
    pub paid_at: Option<Timestamp>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub cancel_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `bill_details` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BillDetail {
    pub id: DbId,
    pub bill_id: DbId,
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: Cents,
    pub discount_percent: i32,
    pub amount_cents: Cents,
    pub created_at: Timestamp,
}

/// Bill with its line items, for detail views.
#[derive(Debug, Clone, Serialize)]
pub struct BillWithDetails {
    #[serde(flatten)]
    pub bill: Bill,
    pub details: Vec<BillDetail>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// A single line item in a create/add request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBillDetail {
    #[validate(length(min = 1, max = 300), custom(function = "validate_not_blank"))]
    pub description: String,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub unit_price_cents: Cents,
    #[validate(range(min = 0, max = 100))]
    pub discount_percent: Option<i32>,
}

/// DTO for issuing a bill manually.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBill {
    pub membership_id: DbId,
    /// Defaults to `other`.
    pub kind: Option<String>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 100), nested)]
    pub details: Vec<CreateBillDetail>,
}

/// Fully computed bill header ready to insert.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub membership_id: DbId,
    pub kind: String,
    pub period: Option<NaiveDate>,
    pub issued_on: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

/// Fully computed line ready to insert.
#[derive(Debug, Clone)]
pub struct NewBillDetail {
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: Cents,
    pub discount_percent: i32,
    pub amount_cents: Cents,
}

/// DTO for recording a payment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PayBill {
    #[validate(length(min = 1, max = 50), custom(function = "validate_not_blank"))]
    pub payment_method: String,
    #[validate(length(max = 100))]
    pub payment_reference: Option<String>,
}

/// DTO for cancelling a bill.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelBill {
    #[validate(length(min = 1, max = 500), custom(function = "validate_not_blank"))]
    pub reason: String,
}

/// DTO for the monthly generation run.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateBills {
    /// Any date inside the target month; normalised to its first day.
    pub period: NaiveDate,
}

/// Outcome of a monthly generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationSummary {
    pub period: Option<NaiveDate>,
    pub created: u64,
    pub skipped: u64,
    pub bill_ids: Vec<DbId>,
}

/// Query filter for bill listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillListParams {
    pub membership_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub kind: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
