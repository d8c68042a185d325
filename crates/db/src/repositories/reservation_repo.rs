//! Repository for the `reservations` table.

use chrono::NaiveTime;
use clubhouse_core::reservation::overlaps;
use clubhouse_core::status::ReservationStatus;
use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::bill::{NewBill, NewBillDetail};
use crate::models::reservation::{NewReservation, Reservation, ReservationListParams};
use crate::repositories::BillRepo;

pub(crate) const COLUMNS: &str = "id, space_id, membership_id, reserved_by, reservation_date, \
                                   start_time, end_time, status_id, total_cents, bill_id, notes, \
                                   cancelled_at, created_at, updated_at";

/// Provides reservation persistence.
pub struct ReservationRepo;

impl ReservationRepo {
    /// Book a slot, optionally charging it.
    ///
    /// The space row is locked for the duration of the transaction so two
    /// concurrent bookings of the same space serialize on the overlap
    /// check. Returns `None` when the slot overlaps a confirmed reservation.
    pub async fn create(
        pool: &PgPool,
        input: &NewReservation,
        charge: Option<(NewBill, NewBillDetail)>,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM spaces WHERE id = $1 FOR UPDATE")
            .bind(input.space_id)
            .execute(&mut *tx)
            .await?;

        let booked: Vec<(NaiveTime, NaiveTime)> = sqlx::query_as(
            "SELECT start_time, end_time FROM reservations
             WHERE space_id = $1 AND reservation_date = $2 AND status_id = $3",
        )
        .bind(input.space_id)
        .bind(input.reservation_date)
        .bind(ReservationStatus::Confirmed.id())
        .fetch_all(&mut *tx)
        .await?;

        if booked
            .iter()
            .any(|&(start, end)| overlaps(input.start_time, input.end_time, start, end))
        {
            return Ok(None);
        }

        let bill_id = match charge {
            Some((bill, detail)) => Some(BillRepo::create_in_tx(&mut tx, &bill, &[detail]).await?.id),
            None => None,
        };

        let query = format!(
            "INSERT INTO reservations
                (space_id, membership_id, reserved_by, reservation_date, start_time, end_time,
                 total_cents, bill_id, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(input.space_id)
            .bind(input.membership_id)
            .bind(input.reserved_by)
            .bind(input.reservation_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.total_cents)
            .bind(bill_id)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(reservation))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reservations WHERE id = $1");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List reservations by date and start time.
    pub async fn list(
        pool: &PgPool,
        params: &ReservationListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservations
             WHERE ($1::BIGINT IS NULL OR space_id = $1)
               AND ($2::BIGINT IS NULL OR membership_id = $2)
               AND ($3::DATE IS NULL OR reservation_date = $3)
               AND ($4::SMALLINT IS NULL OR status_id = $4)
             ORDER BY reservation_date DESC, start_time ASC, id ASC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(params.space_id)
            .bind(params.membership_id)
            .bind(params.date)
            .bind(params.status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Cancel a confirmed reservation and its bill in one transaction.
    ///
    /// A paid bill records a devolution. Returns `None` if the reservation
    /// is missing or already cancelled.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        devolution_rate_percent: i32,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE reservations SET status_id = $2, cancelled_at = NOW()
             WHERE id = $1 AND status_id = $3
             RETURNING {COLUMNS}"
        );
        let Some(reservation) = sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(ReservationStatus::Cancelled.id())
            .bind(ReservationStatus::Confirmed.id())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(bill_id) = reservation.bill_id {
            BillRepo::cancel_in_tx(
                &mut tx,
                bill_id,
                "Reservation cancelled",
                devolution_rate_percent,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(Some(reservation))
    }
}
