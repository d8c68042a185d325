//! Periodic billing maintenance.
//!
//! Every tick: pending bills past their due date become OVERDUE with mora
//! applied, suspensions whose `suspended_until` has passed are lifted, and
//! expired sessions are purged.

use std::time::Duration;

use chrono::Utc;
use clubhouse_db::repositories::{BillRepo, ClubConfigRepo, MembershipRepo, SessionRepo};
use clubhouse_db::DbPool;
use tokio_util::sync::CancellationToken;

pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Counts from one sweep, for logging and the manual trigger endpoint.
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct SweepReport {
    pub bills_marked_overdue: usize,
    pub suspensions_lifted: usize,
    pub sessions_purged: u64,
}

/// Run one sweep now.
pub async fn sweep_once(pool: &DbPool) -> Result<SweepReport, sqlx::Error> {
    let today = Utc::now().date_naive();
    let config = ClubConfigRepo::get(pool).await?;

    let overdue = BillRepo::mark_overdue(pool, today, config.mora_rate_percent).await?;
    let lifted = MembershipRepo::lift_expired_suspensions(pool, today).await?;
    let purged = SessionRepo::cleanup_expired(pool).await?;

    for bill in &overdue {
        tracing::info!(
            bill_id = bill.id,
            membership_id = bill.membership_id,
            mora_cents = bill.mora_cents,
            "Bill marked overdue"
        );
    }
    for membership_id in &lifted {
        tracing::info!(membership_id, "Suspension expired; membership reactivated");
    }

    Ok(SweepReport {
        bills_marked_overdue: overdue.len(),
        suspensions_lifted: lifted.len(),
        sessions_purged: purged,
    })
}

/// Run the sweep loop every `interval` until `cancel` is triggered.
///
/// Intervals shorter than [`MIN_INTERVAL`] are raised to it.
pub async fn run(pool: DbPool, interval: Duration, cancel: CancellationToken) {
    let interval = interval.max(MIN_INTERVAL);
    tracing::info!(interval_secs = interval.as_secs(), "Billing sweep started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Billing sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match sweep_once(&pool).await {
                    Ok(report) => tracing::debug!(?report, "Billing sweep finished"),
                    Err(e) => tracing::error!(error = %e, "Billing sweep failed"),
                }
            }
        }
    }
}
