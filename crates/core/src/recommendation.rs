//! Sponsor (recommendation) rules for membership applications.
//!
//! Every application must be backed by [`REQUIRED_RECOMMENDERS`] existing
//! members in good standing. The database layer loads one
//! [`RecommenderSnapshot`] per proposed recommender and
//! [`validate_recommenders`] decides whether the set is acceptable.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::membership::{months_between, RELATIONSHIP_TITULAR};
use crate::status::MembershipState;
use crate::types::DbId;

/// Number of distinct recommenders an application needs.
pub const REQUIRED_RECOMMENDERS: usize = 2;

/// What we know about a proposed recommender at validation time.
#[derive(Debug, Clone)]
pub struct RecommenderSnapshot {
    pub user_id: DbId,
    pub full_name: String,
    pub relationship: String,
    pub is_active: bool,
    pub membership_id: Option<DbId>,
    pub membership_state_id: Option<i16>,
    pub membership_started_on: Option<NaiveDate>,
    pub overdue_bills: i64,
}

/// Validate the proposed recommender ids before loading them.
///
/// Checks the count and rejects duplicates.
pub fn validate_recommender_ids(ids: &[DbId]) -> Result<(), CoreError> {
    if ids.len() != REQUIRED_RECOMMENDERS {
        return Err(CoreError::Validation(format!(
            "Exactly {REQUIRED_RECOMMENDERS} recommenders are required, got {}",
            ids.len()
        )));
    }
    let unique: HashSet<_> = ids.iter().collect();
    if unique.len() != ids.len() {
        return Err(CoreError::Validation(
            "Recommenders must be different members".into(),
        ));
    }
    Ok(())
}

/// Collect every reason a single recommender is not eligible.
pub fn recommender_violations(
    snapshot: &RecommenderSnapshot,
    min_membership_months: i32,
    today: NaiveDate,
) -> Vec<String> {
    let who = format!("{} (user {})", snapshot.full_name, snapshot.user_id);
    let mut problems = Vec::new();

    if !snapshot.is_active {
        problems.push(format!("{who} is not an active member"));
    }
    if snapshot.relationship != RELATIONSHIP_TITULAR {
        problems.push(format!("{who} is not the titular of a membership"));
    }

    let Some(_) = snapshot.membership_id else {
        problems.push(format!("{who} does not belong to a membership"));
        return problems;
    };

    if snapshot.membership_state_id != Some(MembershipState::Active.id()) {
        problems.push(format!("{who} does not hold an active membership"));
    }

    if let Some(started_on) = snapshot.membership_started_on {
        let months = months_between(started_on, today);
        if months < min_membership_months {
            problems.push(format!(
                "{who} has {months} month(s) of membership; {min_membership_months} required"
            ));
        }
    }

    if snapshot.overdue_bills > 0 {
        problems.push(format!(
            "{who} has {} overdue bill(s)",
            snapshot.overdue_bills
        ));
    }

    problems
}

/// Validate a complete set of recommenders.
///
/// All violations are reported together in a single
/// [`CoreError::Validation`] so the applicant sees every problem at once.
pub fn validate_recommenders(
    snapshots: &[RecommenderSnapshot],
    min_membership_months: i32,
    today: NaiveDate,
) -> Result<(), CoreError> {
    if snapshots.len() != REQUIRED_RECOMMENDERS {
        return Err(CoreError::Validation(format!(
            "Exactly {REQUIRED_RECOMMENDERS} recommenders are required, found {}",
            snapshots.len()
        )));
    }

    let mut problems: Vec<String> = snapshots
        .iter()
        .flat_map(|s| recommender_violations(s, min_membership_months, today))
        .collect();

    let memberships: HashSet<_> = snapshots.iter().filter_map(|s| s.membership_id).collect();
    if memberships.len() < snapshots.iter().filter(|s| s.membership_id.is_some()).count() {
        problems.push("Recommenders must belong to different memberships".into());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(problems.join("; ")))
    }
}
