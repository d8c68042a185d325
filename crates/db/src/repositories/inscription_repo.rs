//! Repository for `reservation_inscriptions` and `event_inscriptions`.
//!
//! Capacity checks lock the parent row (reservation or event) so concurrent
//! inscriptions cannot overfill it.

use clubhouse_core::reservation::ensure_capacity;
use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::bill::{NewBill, NewBillDetail};
use crate::models::event::EventInscription;
use crate::models::reservation::{CreateInscription, ReservationInscription};
use crate::repositories::BillRepo;

const RESERVATION_COLUMNS: &str =
    "id, reservation_id, user_id, guest_name, guest_document, created_at";

const EVENT_COLUMNS: &str = "id, event_id, user_id, membership_id, bill_id, created_at";

pub struct InscriptionRepo;

impl InscriptionRepo {
    // -----------------------------------------------------------------------
    // Reservation inscriptions
    // -----------------------------------------------------------------------

    /// Register a member or guest on a reservation.
    ///
    /// Returns `None` when `capacity` has been reached.
    pub async fn add_to_reservation(
        pool: &PgPool,
        reservation_id: DbId,
        capacity: i32,
        input: &CreateInscription,
    ) -> Result<Option<ReservationInscription>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM reservations WHERE id = $1 FOR UPDATE")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;
        let current: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservation_inscriptions WHERE reservation_id = $1",
        )
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;
        if ensure_capacity(current, capacity).is_err() {
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO reservation_inscriptions (reservation_id, user_id, guest_name, guest_document)
             VALUES ($1, $2, $3, $4)
             RETURNING {RESERVATION_COLUMNS}"
        );
        let inscription = sqlx::query_as::<_, ReservationInscription>(&query)
            .bind(reservation_id)
            .bind(input.user_id)
            .bind(input.guest_name.as_deref().map(str::trim))
            .bind(&input.guest_document)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(inscription))
    }

    pub async fn list_for_reservation(
        pool: &PgPool,
        reservation_id: DbId,
    ) -> Result<Vec<ReservationInscription>, sqlx::Error> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservation_inscriptions
             WHERE reservation_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, ReservationInscription>(&query)
            .bind(reservation_id)
            .fetch_all(pool)
            .await
    }

    /// Returns `true` if the inscription existed on that reservation.
    pub async fn remove_from_reservation(
        pool: &PgPool,
        reservation_id: DbId,
        inscription_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM reservation_inscriptions WHERE id = $1 AND reservation_id = $2",
        )
        .bind(inscription_id)
        .bind(reservation_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Event inscriptions
    // -----------------------------------------------------------------------

    /// Register a member on an event, issuing `charge` as a bill if given.
    ///
    /// Returns `None` when `capacity` has been reached.
    pub async fn add_to_event(
        pool: &PgPool,
        event_id: DbId,
        user_id: DbId,
        membership_id: DbId,
        capacity: i32,
        charge: Option<(NewBill, NewBillDetail)>,
    ) -> Result<Option<EventInscription>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        let current: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_inscriptions WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;
        if ensure_capacity(current, capacity).is_err() {
            return Ok(None);
        }

        let bill_id = match charge {
            Some((bill, detail)) => Some(BillRepo::create_in_tx(&mut tx, &bill, &[detail]).await?.id),
            None => None,
        };

        let query = format!(
            "INSERT INTO event_inscriptions (event_id, user_id, membership_id, bill_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {EVENT_COLUMNS}"
        );
        let inscription = sqlx::query_as::<_, EventInscription>(&query)
            .bind(event_id)
            .bind(user_id)
            .bind(membership_id)
            .bind(bill_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(inscription))
    }

    pub async fn list_for_event(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<Vec<EventInscription>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM event_inscriptions WHERE event_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, EventInscription>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_event_inscription(
        pool: &PgPool,
        event_id: DbId,
        user_id: DbId,
    ) -> Result<Option<EventInscription>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM event_inscriptions WHERE event_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, EventInscription>(&query)
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Withdraw from an event, cancelling the inscription's bill.
    ///
    /// Returns `true` if the inscription existed.
    pub async fn cancel_event_inscription(
        pool: &PgPool,
        inscription_id: DbId,
        devolution_rate_percent: i32,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed: Option<Option<DbId>> =
            sqlx::query_scalar("DELETE FROM event_inscriptions WHERE id = $1 RETURNING bill_id")
                .bind(inscription_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(bill_id) = removed else {
            return Ok(false);
        };

        if let Some(bill_id) = bill_id {
            BillRepo::cancel_in_tx(
                &mut tx,
                bill_id,
                "Event inscription cancelled",
                devolution_rate_percent,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
