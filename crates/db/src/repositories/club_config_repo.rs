//! Repository for the single-row `club_config` table.

use sqlx::PgPool;

use crate::models::club_config::{ClubConfig, UpdateClubConfig};

const COLUMNS: &str = "club_name, due_day_of_month, mora_rate_percent, devolution_rate_percent, \
                        suspended_fee_percent, min_recommender_months, delinquency_threshold, \
                        reservation_cancel_hours, max_reservation_hours, updated_at";

pub struct ClubConfigRepo;

impl ClubConfigRepo {
    /// Load the club configuration. The row is seeded by migrations.
    pub async fn get(pool: &PgPool) -> Result<ClubConfig, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM club_config WHERE id = 1");
        sqlx::query_as::<_, ClubConfig>(&query).fetch_one(pool).await
    }

    /// Update the configuration. Only non-`None` fields in `input` are applied.
    pub async fn update(pool: &PgPool, input: &UpdateClubConfig) -> Result<ClubConfig, sqlx::Error> {
        let query = format!(
            "UPDATE club_config SET
                club_name = COALESCE($1, club_name),
                due_day_of_month = COALESCE($2, due_day_of_month),
                mora_rate_percent = COALESCE($3, mora_rate_percent),
                devolution_rate_percent = COALESCE($4, devolution_rate_percent),
                suspended_fee_percent = COALESCE($5, suspended_fee_percent),
                min_recommender_months = COALESCE($6, min_recommender_months),
                delinquency_threshold = COALESCE($7, delinquency_threshold),
                reservation_cancel_hours = COALESCE($8, reservation_cancel_hours),
                max_reservation_hours = COALESCE($9, max_reservation_hours)
             WHERE id = 1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClubConfig>(&query)
            .bind(&input.club_name)
            .bind(input.due_day_of_month)
            .bind(input.mora_rate_percent)
            .bind(input.devolution_rate_percent)
            .bind(input.suspended_fee_percent)
            .bind(input.min_recommender_months)
            .bind(input.delinquency_threshold)
            .bind(input.reservation_cancel_hours)
            .bind(input.max_reservation_hours)
            .fetch_one(pool)
            .await
    }
}
