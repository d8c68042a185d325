//! Repository for the `memberships` table.

use chrono::NaiveDate;
use clubhouse_core::billing::is_delinquent;
use clubhouse_core::membership::membership_code;
use clubhouse_core::status::{BillStatus, MembershipState};
use clubhouse_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::membership::{
    AccountStatus, BillableMembership, Membership, MembershipListParams, UpdateMembership,
};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, code, membership_type_id, state_id, started_on, \
                                   suspended_until, state_reason, discount_percent, \
                                   created_at, updated_at";

/// A guarded state change: applied only while the row is still in `from`.
#[derive(Debug, Clone)]
pub struct StateChange<'a> {
    pub from: MembershipState,
    pub to: MembershipState,
    pub suspended_until: Option<NaiveDate>,
    pub reason: Option<&'a str>,
}

/// Provides membership persistence and lifecycle writes.
pub struct MembershipRepo;

impl MembershipRepo {
    /// Insert a new ACTIVE membership inside an open transaction.
    ///
    /// The id is drawn first so the code (`M-000042`) can be derived from it.
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        membership_type_id: DbId,
        started_on: NaiveDate,
    ) -> Result<Membership, sqlx::Error> {
        let id: DbId =
            sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('memberships', 'id'))")
                .fetch_one(&mut **tx)
                .await?;

        let query = format!(
            "INSERT INTO memberships (id, code, membership_type_id, started_on)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Membership>(&query)
            .bind(id)
            .bind(membership_code(id))
            .bind(membership_type_id)
            .bind(started_on)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Membership>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM memberships WHERE id = $1");
        sqlx::query_as::<_, Membership>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &MembershipListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Membership>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM memberships
             WHERE ($1::SMALLINT IS NULL OR state_id = $1)
             ORDER BY id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Membership>(&query)
            .bind(params.state_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Change plan or discount. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMembership,
    ) -> Result<Option<Membership>, sqlx::Error> {
        let query = format!(
            "UPDATE memberships SET
                membership_type_id = COALESCE($2, membership_type_id),
                discount_percent = COALESCE($3, discount_percent)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Membership>(&query)
            .bind(id)
            .bind(input.membership_type_id)
            .bind(input.discount_percent)
            .fetch_optional(pool)
            .await
    }

    /// Apply a state change in its own transaction.
    ///
    /// Returns `None` when the membership is missing or no longer in
    /// `change.from`.
    pub async fn change_state(
        pool: &PgPool,
        id: DbId,
        change: &StateChange<'_>,
    ) -> Result<Option<Membership>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let membership = Self::change_state_in_tx(&mut tx, id, change).await?;
        if membership.is_some() {
            tx.commit().await?;
        }
        Ok(membership)
    }

    /// Apply a state change inside an open transaction.
    ///
    /// Disaffiliation also deactivates every user of the membership.
    pub async fn change_state_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        change: &StateChange<'_>,
    ) -> Result<Option<Membership>, sqlx::Error> {
        let query = format!(
            "UPDATE memberships SET
                state_id = $3,
                suspended_until = $4,
                state_reason = $5
             WHERE id = $1 AND state_id = $2
             RETURNING {COLUMNS}"
        );
        let membership = sqlx::query_as::<_, Membership>(&query)
            .bind(id)
            .bind(change.from.id())
            .bind(change.to.id())
            .bind(change.suspended_until)
            .bind(change.reason)
            .fetch_optional(&mut **tx)
            .await?;

        if membership.is_some() && change.to == MembershipState::Disaffiliated {
            sqlx::query("UPDATE users SET is_active = false WHERE membership_id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(membership)
    }

    /// Memberships that receive a monthly fee, joined with their plan.
    pub async fn list_billable(pool: &PgPool) -> Result<Vec<BillableMembership>, sqlx::Error> {
        sqlx::query_as::<_, BillableMembership>(
            "SELECT m.id, m.code, m.state_id, m.discount_percent,
                    t.monthly_fee_cents, t.name AS membership_type_name
             FROM memberships m
             JOIN membership_types t ON t.id = m.membership_type_id
             WHERE m.state_id IN ($1, $2)
             ORDER BY m.id ASC",
        )
        .bind(MembershipState::Active.id())
        .bind(MembershipState::Suspended.id())
        .fetch_all(pool)
        .await
    }

    /// Pending and overdue balances of a membership.
    pub async fn account_status(
        pool: &PgPool,
        id: DbId,
        delinquency_threshold: i32,
    ) -> Result<AccountStatus, sqlx::Error> {
        let (pending_cents, pending_bills, overdue_cents, overdue_bills): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                    COALESCE(SUM(total_cents) FILTER (WHERE status_id = $2), 0)::BIGINT,
                    COUNT(*) FILTER (WHERE status_id = $2),
                    COALESCE(SUM(total_cents) FILTER (WHERE status_id = $3), 0)::BIGINT,
                    COUNT(*) FILTER (WHERE status_id = $3)
                 FROM bills
                 WHERE membership_id = $1",
            )
            .bind(id)
            .bind(BillStatus::Pending.id())
            .bind(BillStatus::Overdue.id())
            .fetch_one(pool)
            .await?;

        Ok(AccountStatus {
            membership_id: id,
            pending_cents,
            pending_bills,
            overdue_cents,
            overdue_bills,
            delinquent: is_delinquent(overdue_bills, delinquency_threshold),
        })
    }

    /// Reactivate suspensions whose `suspended_until` has passed, unless the
    /// membership still has overdue bills. Returns the reactivated ids.
    pub async fn lift_expired_suspensions(
        pool: &PgPool,
        today: NaiveDate,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE memberships m SET
                state_id = $1,
                suspended_until = NULL,
                state_reason = 'Suspension period ended'
             WHERE m.state_id = $2
               AND m.suspended_until IS NOT NULL
               AND m.suspended_until < $3
               AND NOT EXISTS (
                   SELECT 1 FROM bills b WHERE b.membership_id = m.id AND b.status_id = $4
               )
             RETURNING m.id",
        )
        .bind(MembershipState::Active.id())
        .bind(MembershipState::Suspended.id())
        .bind(today)
        .bind(BillStatus::Overdue.id())
        .fetch_all(pool)
        .await
    }
}
