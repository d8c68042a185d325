//! Repository for the `bills` and `bill_details` tables.
//!
//! Bill totals are never written directly by callers: every path that
//! touches details finishes with [`BillRepo::recompute_totals_in_tx`], which
//! derives subtotal, discount, mora, and total from the stored lines using
//! `clubhouse_core::billing`.

use chrono::NaiveDate;
use clubhouse_core::billing::{
    self, cancellation_devolution, compute_totals, line_amount, monthly_fee_cents, mora_cents,
    LineAmount, KIND_ADMISSION, KIND_MONTHLY_FEE,
};
use clubhouse_core::error::CoreError;
use clubhouse_core::status::{BillStatus, MembershipState};
use clubhouse_core::types::{Cents, DbId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::bill::{
    Bill, BillDetail, BillListParams, BillWithDetails, GenerationSummary, NewBill, NewBillDetail,
    PayBill,
};
use crate::repositories::MembershipRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, membership_id, kind, period, issued_on, due_date, status_id, \
                        subtotal_cents, discount_cents, mora_cents, total_cents, \
                        devolution_cents, paid_at, payment_method, payment_reference, \
                        cancel_reason, notes, created_at, updated_at";

const DETAIL_COLUMNS: &str = "id, bill_id, description, quantity, unit_price_cents, \
                               discount_percent, amount_cents, created_at";

/// Parameters of one monthly fee generation run.
#[derive(Debug, Clone, Copy)]
pub struct MonthlyRun {
    /// First day of the billed month.
    pub period: NaiveDate,
    pub issued_on: NaiveDate,
    pub due_date: NaiveDate,
    pub suspended_fee_percent: i32,
}

/// Provides bill persistence, totals, payment, cancellation, and sweeps.
pub struct BillRepo;

impl BillRepo {
    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Insert a bill with its details in one transaction.
    pub async fn create(
        pool: &PgPool,
        bill: &NewBill,
        details: &[NewBillDetail],
    ) -> Result<Bill, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let created = Self::create_in_tx(&mut tx, bill, details).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Insert a bill with its details inside an open transaction.
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        bill: &NewBill,
        details: &[NewBillDetail],
    ) -> Result<Bill, sqlx::Error> {
        let query = format!(
            "INSERT INTO bills (membership_id, kind, period, issued_on, due_date, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let header = sqlx::query_as::<_, Bill>(&query)
            .bind(bill.membership_id)
            .bind(&bill.kind)
            .bind(bill.period)
            .bind(bill.issued_on)
            .bind(bill.due_date)
            .bind(&bill.notes)
            .fetch_one(&mut **tx)
            .await?;

        Self::insert_details_in_tx(tx, header.id, details).await?;
        Self::recompute_totals_in_tx(tx, header.id, 0).await
    }

    /// Like [`Self::create_in_tx`] but skips the insert when the
    /// membership already has a monthly fee bill for `bill.period`.
    async fn try_create_monthly_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        bill: &NewBill,
        detail: &NewBillDetail,
    ) -> Result<Option<Bill>, sqlx::Error> {
        let query = format!(
            "INSERT INTO bills (membership_id, kind, period, issued_on, due_date, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (membership_id, period) WHERE kind = 'monthly_fee' DO NOTHING
             RETURNING {COLUMNS}"
        );
        let header = sqlx::query_as::<_, Bill>(&query)
            .bind(bill.membership_id)
            .bind(&bill.kind)
            .bind(bill.period)
            .bind(bill.issued_on)
            .bind(bill.due_date)
            .bind(&bill.notes)
            .fetch_optional(&mut **tx)
            .await?;

        let Some(header) = header else {
            return Ok(None);
        };
        Self::insert_details_in_tx(tx, header.id, std::slice::from_ref(detail)).await?;
        Self::recompute_totals_in_tx(tx, header.id, 0).await.map(Some)
    }

    async fn insert_details_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        bill_id: DbId,
        details: &[NewBillDetail],
    ) -> Result<(), sqlx::Error> {
        for detail in details {
            sqlx::query(
                "INSERT INTO bill_details
                    (bill_id, description, quantity, unit_price_cents, discount_percent, amount_cents)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(bill_id)
            .bind(&detail.description)
            .bind(detail.quantity)
            .bind(detail.unit_price_cents)
            .bind(detail.discount_percent)
            .bind(detail.amount_cents)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Generate monthly fee bills for every billable membership.
    ///
    /// Active memberships pay the full plan fee and suspended ones the
    /// configured fraction; the membership discount is applied on the fee
    /// line. Memberships already billed for the period, or with a zero fee,
    /// are counted as skipped. The run is atomic.
    pub async fn generate_monthly(
        pool: &PgPool,
        run: &MonthlyRun,
    ) -> Result<GenerationSummary, sqlx::Error> {
        let memberships = MembershipRepo::list_billable(pool).await?;
        let mut summary = GenerationSummary {
            period: Some(run.period),
            ..Default::default()
        };

        let mut tx = pool.begin().await?;
        for membership in &memberships {
            let Some(state) = MembershipState::from_id(membership.state_id) else {
                summary.skipped += 1;
                continue;
            };
            let fee = monthly_fee_cents(
                membership.monthly_fee_cents,
                state,
                run.suspended_fee_percent,
            )
            .unwrap_or(0);
            if fee <= 0 {
                summary.skipped += 1;
                continue;
            }
            let Ok(line) = line_amount(1, fee, membership.discount_percent) else {
                summary.skipped += 1;
                continue;
            };

            let mut description = format!(
                "Monthly fee {} - {}",
                run.period.format("%Y-%m"),
                membership.membership_type_name
            );
            if state == MembershipState::Suspended {
                description.push_str(&format!(" (suspended, {}%)", run.suspended_fee_percent));
            }

            let bill = NewBill {
                membership_id: membership.id,
                kind: KIND_MONTHLY_FEE.to_string(),
                period: Some(run.period),
                issued_on: run.issued_on,
                due_date: run.due_date,
                notes: None,
            };
            let detail = NewBillDetail {
                description,
                quantity: 1,
                unit_price_cents: fee,
                discount_percent: membership.discount_percent,
                amount_cents: line.net,
            };

            match Self::try_create_monthly_in_tx(&mut tx, &bill, &detail).await? {
                Some(created) => {
                    summary.created += 1;
                    summary.bill_ids.push(created.id);
                }
                None => summary.skipped += 1,
            }
        }
        tx.commit().await?;

        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Bill>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bills WHERE id = $1");
        sqlx::query_as::<_, Bill>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A bill together with its detail lines.
    pub async fn find_with_details(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BillWithDetails>, sqlx::Error> {
        let Some(bill) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let details = Self::list_details(pool, id).await?;
        Ok(Some(BillWithDetails { bill, details }))
    }

    pub async fn list_details(pool: &PgPool, bill_id: DbId) -> Result<Vec<BillDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS} FROM bill_details WHERE bill_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, BillDetail>(&query)
            .bind(bill_id)
            .fetch_all(pool)
            .await
    }

    /// List bills, most recently issued first.
    pub async fn list(
        pool: &PgPool,
        params: &BillListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Bill>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bills
             WHERE ($1::BIGINT IS NULL OR membership_id = $1)
               AND ($2::SMALLINT IS NULL OR status_id = $2)
               AND ($3::TEXT IS NULL OR kind = $3)
             ORDER BY issued_on DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Bill>(&query)
            .bind(params.membership_id)
            .bind(params.status_id)
            .bind(&params.kind)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_overdue(pool: &PgPool, membership_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE membership_id = $1 AND status_id = $2")
            .bind(membership_id)
            .bind(BillStatus::Overdue.id())
            .fetch_one(pool)
            .await
    }

    /// Total paid on admission bills of a membership.
    pub async fn paid_admission_cents(
        pool: &PgPool,
        membership_id: DbId,
    ) -> Result<Cents, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM bills
             WHERE membership_id = $1 AND kind = $2 AND status_id = $3",
        )
        .bind(membership_id)
        .bind(KIND_ADMISSION)
        .bind(BillStatus::Paid.id())
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Details and totals
    // -----------------------------------------------------------------------

    /// Lock a bill for editing. `None` when missing or no longer owed.
    async fn lock_editable(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Bill>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bills WHERE id = $1 AND status_id IN ($2, $3) FOR UPDATE"
        );
        sqlx::query_as::<_, Bill>(&query)
            .bind(id)
            .bind(BillStatus::Pending.id())
            .bind(BillStatus::Overdue.id())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Append a line to an editable bill and recompute its totals.
    pub async fn add_detail(
        pool: &PgPool,
        bill_id: DbId,
        detail: &NewBillDetail,
        mora_rate_percent: i32,
    ) -> Result<Option<Bill>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        if Self::lock_editable(&mut tx, bill_id).await?.is_none() {
            return Ok(None);
        }
        Self::insert_details_in_tx(&mut tx, bill_id, std::slice::from_ref(detail)).await?;
        let bill = Self::recompute_totals_in_tx(&mut tx, bill_id, mora_rate_percent).await?;
        tx.commit().await?;
        Ok(Some(bill))
    }

    /// Remove a line from an editable bill and recompute its totals.
    ///
    /// Returns `None` when the bill is not editable or the line does not
    /// belong to it.
    pub async fn delete_detail(
        pool: &PgPool,
        bill_id: DbId,
        detail_id: DbId,
        mora_rate_percent: i32,
    ) -> Result<Option<Bill>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        if Self::lock_editable(&mut tx, bill_id).await?.is_none() {
            return Ok(None);
        }
        let removed = sqlx::query("DELETE FROM bill_details WHERE id = $1 AND bill_id = $2")
            .bind(detail_id)
            .bind(bill_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            return Ok(None);
        }
        let bill = Self::recompute_totals_in_tx(&mut tx, bill_id, mora_rate_percent).await?;
        tx.commit().await?;
        Ok(Some(bill))
    }

    /// Recompute totals of an editable bill from its lines.
    pub async fn recalculate(
        pool: &PgPool,
        bill_id: DbId,
        mora_rate_percent: i32,
    ) -> Result<Option<Bill>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        if Self::lock_editable(&mut tx, bill_id).await?.is_none() {
            return Ok(None);
        }
        let bill = Self::recompute_totals_in_tx(&mut tx, bill_id, mora_rate_percent).await?;
        tx.commit().await?;
        Ok(Some(bill))
    }

    /// Derive and store the totals of a bill from its detail lines.
    ///
    /// Overdue bills carry `mora_rate_percent` of their net amount as mora;
    /// every other status carries none.
    pub async fn recompute_totals_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        bill_id: DbId,
        mora_rate_percent: i32,
    ) -> Result<Bill, sqlx::Error> {
        let rows: Vec<(i32, Cents, Cents)> = sqlx::query_as(
            "SELECT quantity, unit_price_cents, amount_cents FROM bill_details WHERE bill_id = $1",
        )
        .bind(bill_id)
        .fetch_all(&mut **tx)
        .await?;

        let lines = rows
            .into_iter()
            .map(|(quantity, unit_price, net)| {
                let gross = unit_price
                    .checked_mul(quantity as Cents)
                    .ok_or_else(|| CoreError::Validation("Line amount overflows".into()))?;
                Ok(LineAmount {
                    gross,
                    discount: gross - net,
                    net,
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()
            .map_err(arithmetic_error)?;

        let status_id: i16 = sqlx::query_scalar("SELECT status_id FROM bills WHERE id = $1")
            .bind(bill_id)
            .fetch_one(&mut **tx)
            .await?;
        let mora = if status_id == BillStatus::Overdue.id() {
            let net = compute_totals(&lines, 0).map_err(arithmetic_error)?.total;
            mora_cents(net, mora_rate_percent)
        } else {
            0
        };
        let totals = compute_totals(&lines, mora).map_err(arithmetic_error)?;

        let query = format!(
            "UPDATE bills SET
                subtotal_cents = $2,
                discount_cents = $3,
                mora_cents = $4,
                total_cents = $5
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bill>(&query)
            .bind(bill_id)
            .bind(totals.subtotal)
            .bind(totals.discount)
            .bind(totals.mora)
            .bind(totals.total)
            .fetch_one(&mut **tx)
            .await
    }

    // -----------------------------------------------------------------------
    // Status changes
    // -----------------------------------------------------------------------

    /// Record a payment. `None` unless the bill is pending or overdue.
    pub async fn pay(pool: &PgPool, id: DbId, input: &PayBill) -> Result<Option<Bill>, sqlx::Error> {
        let query = format!(
            "UPDATE bills SET
                status_id = $2,
                paid_at = NOW(),
                payment_method = $3,
                payment_reference = $4
             WHERE id = $1 AND status_id IN ($5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bill>(&query)
            .bind(id)
            .bind(BillStatus::Paid.id())
            .bind(input.payment_method.trim())
            .bind(&input.payment_reference)
            .bind(BillStatus::Pending.id())
            .bind(BillStatus::Overdue.id())
            .fetch_optional(pool)
            .await
    }

    /// Cancel a bill in its own transaction. See [`Self::cancel_in_tx`].
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        reason: &str,
        devolution_rate_percent: i32,
    ) -> Result<Option<Bill>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let bill = Self::cancel_in_tx(&mut tx, id, reason, devolution_rate_percent).await?;
        tx.commit().await?;
        Ok(bill)
    }

    /// Cancel a bill inside an open transaction.
    ///
    /// Paid bills record a devolution of `devolution_rate_percent` of their
    /// total. Returns `None` when the bill is missing or already cancelled.
    pub async fn cancel_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        reason: &str,
        devolution_rate_percent: i32,
    ) -> Result<Option<Bill>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bills WHERE id = $1 FOR UPDATE");
        let Some(bill) = sqlx::query_as::<_, Bill>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
        else {
            return Ok(None);
        };

        let Ok(devolution) =
            cancellation_devolution(bill.status_id, bill.total_cents, devolution_rate_percent)
        else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE bills SET
                status_id = $2,
                devolution_cents = $3,
                cancel_reason = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bill>(&query)
            .bind(id)
            .bind(BillStatus::Cancelled.id())
            .bind(devolution)
            .bind(reason)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Move pending bills due before `today` to OVERDUE and charge mora.
    ///
    /// Rows locked by a concurrent sweep are skipped.
    pub async fn mark_overdue(
        pool: &PgPool,
        today: NaiveDate,
        mora_rate_percent: i32,
    ) -> Result<Vec<Bill>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM bills
             WHERE status_id = $1 AND due_date < $2
             ORDER BY id ASC
             FOR UPDATE SKIP LOCKED"
        );
        let candidates = sqlx::query_as::<_, Bill>(&query)
            .bind(BillStatus::Pending.id())
            .bind(today)
            .fetch_all(&mut *tx)
            .await?;

        let update = format!(
            "UPDATE bills SET status_id = $2, mora_cents = $3, total_cents = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let mut overdue = Vec::with_capacity(candidates.len());
        for bill in candidates {
            if billing::ensure_overdue_candidate(bill.status_id).is_err() {
                continue;
            }
            let net = bill.total_cents - bill.mora_cents;
            let mora = mora_cents(net, mora_rate_percent);
            let updated = sqlx::query_as::<_, Bill>(&update)
                .bind(bill.id)
                .bind(BillStatus::Overdue.id())
                .bind(mora)
                .bind(net + mora)
                .fetch_one(&mut *tx)
                .await?;
            overdue.push(updated);
        }

        tx.commit().await?;
        Ok(overdue)
    }
}

/// Totals that no longer fit in cents surface as a decode failure.
fn arithmetic_error(err: CoreError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
