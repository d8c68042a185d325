use assert_matches::assert_matches;
use clubhouse_core::status::{
    BillStatus, EventStatus, MembershipState, RequestStatus, ReservationStatus,
};
use clubhouse_db::repositories::{ClubConfigRepo, RoleRepo};
use sqlx::PgPool;

/// Connect, migrate, and verify lookup tables match the Rust enums.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    clubhouse_db::health_check(&pool).await.unwrap();

    let expected: [(&str, Vec<(i16, &str)>); 5] = [
        (
            "membership_states",
            [
                MembershipState::Active,
                MembershipState::Suspended,
                MembershipState::Disaffiliated,
            ]
            .iter()
            .map(|s| (s.id(), s.name()))
            .collect(),
        ),
        (
            "request_statuses",
            [
                RequestStatus::Pending,
                RequestStatus::Rejected,
                RequestStatus::Approved,
            ]
            .iter()
            .map(|s| (s.id(), s.name()))
            .collect(),
        ),
        (
            "bill_statuses",
            [
                BillStatus::Pending,
                BillStatus::Paid,
                BillStatus::Overdue,
                BillStatus::Cancelled,
            ]
            .iter()
            .map(|s| (s.id(), s.name()))
            .collect(),
        ),
        (
            "reservation_statuses",
            [ReservationStatus::Confirmed, ReservationStatus::Cancelled]
                .iter()
                .map(|s| (s.id(), s.name()))
                .collect(),
        ),
        (
            "event_statuses",
            [EventStatus::Scheduled, EventStatus::Cancelled]
                .iter()
                .map(|s| (s.id(), s.name()))
                .collect(),
        ),
    ];

    for (table, statuses) in expected {
        for (id, name) in statuses {
            let stored: String = sqlx::query_scalar(&format!("SELECT name FROM {table} WHERE id = $1"))
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap_or_else(|e| panic!("{table} id {id} missing: {e}"));
            assert_eq!(stored, name, "{table} id {id}");
        }
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_roles_are_seeded_in_order(pool: PgPool) {
    let roles = RoleRepo::list(&pool).await.unwrap();
    let names: Vec<_> = roles.iter().map(|r| (r.id, r.name.as_str())).collect();
    assert_eq!(names, vec![(1, "admin"), (2, "employee"), (3, "member")]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_club_config_defaults(pool: PgPool) {
    let config = ClubConfigRepo::get(&pool).await.unwrap();
    assert_eq!(config.due_day_of_month, 10);
    assert_eq!(config.mora_rate_percent, 5);
    assert_eq!(config.devolution_rate_percent, 50);
    assert_eq!(config.suspended_fee_percent, 25);
    assert_eq!(config.min_recommender_months, 12);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_club_config_is_single_row(pool: PgPool) {
    let result = sqlx::query("INSERT INTO club_config (id) VALUES (2)")
        .execute(&pool)
        .await;
    assert_matches!(result, Err(sqlx::Error::Database(_)));
}
