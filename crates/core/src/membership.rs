//! Membership lifecycle rules (suspension, disaffiliation, reactivation),
//! member relationships, and dependent limits.

use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;
use crate::status::MembershipState;

/// The member who holds the membership.
pub const RELATIONSHIP_TITULAR: &str = "titular";
pub const RELATIONSHIP_SPOUSE: &str = "spouse";
pub const RELATIONSHIP_CHILD: &str = "child";
pub const RELATIONSHIP_OTHER: &str = "other";

/// All valid relationship values.
pub const VALID_RELATIONSHIPS: &[&str] = &[
    RELATIONSHIP_TITULAR,
    RELATIONSHIP_SPOUSE,
    RELATIONSHIP_CHILD,
    RELATIONSHIP_OTHER,
];

/// Change request kind: temporarily suspend an active membership.
pub const REQUEST_SUSPENSION: &str = "suspension";
/// Change request kind: permanently leave the club.
pub const REQUEST_DISAFFILIATION: &str = "disaffiliation";
/// Change request kind: return a suspended membership to active.
pub const REQUEST_REACTIVATION: &str = "reactivation";

/// All valid change request kinds.
pub const VALID_REQUEST_KINDS: &[&str] = &[
    REQUEST_SUSPENSION,
    REQUEST_DISAFFILIATION,
    REQUEST_REACTIVATION,
];

/// A state-changing action on a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    Suspend,
    Disaffiliate,
    Reactivate,
}

impl MembershipAction {
    /// Parse a change request kind into the action it triggers.
    pub fn from_request_kind(kind: &str) -> Result<Self, CoreError> {
        match kind {
            REQUEST_SUSPENSION => Ok(Self::Suspend),
            REQUEST_DISAFFILIATION => Ok(Self::Disaffiliate),
            REQUEST_REACTIVATION => Ok(Self::Reactivate),
            other => Err(CoreError::Validation(format!(
                "Invalid request kind '{other}'. Must be one of: {}",
                VALID_REQUEST_KINDS.join(", ")
            ))),
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Disaffiliate => "disaffiliate",
            Self::Reactivate => "reactivate",
        }
    }
}

/// Resolve the target state for `action` applied to a membership in `from`.
pub fn transition(
    from: MembershipState,
    action: MembershipAction,
) -> Result<MembershipState, CoreError> {
    use MembershipAction::*;
    use MembershipState::*;

    match (from, action) {
        (Active, Suspend) => Ok(Suspended),
        (Active | Suspended, Disaffiliate) => Ok(Disaffiliated),
        (Suspended, Reactivate) => Ok(Active),
        (state, action) => Err(CoreError::Conflict(format!(
            "Cannot {} a membership that is {state}",
            action.verb()
        ))),
    }
}

/// Facts about a membership needed to decide a transition.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    pub state: MembershipState,
    pub overdue_bills: i64,
    pub suspend_until: Option<NaiveDate>,
    pub today: NaiveDate,
}

/// Validate and resolve a transition with its preconditions.
///
/// - Suspension needs a `suspend_until` date in the future.
/// - Reactivation is refused while overdue bills exist.
pub fn plan_transition(
    ctx: TransitionContext,
    action: MembershipAction,
) -> Result<MembershipState, CoreError> {
    let target = transition(ctx.state, action)?;

    match action {
        MembershipAction::Suspend => match ctx.suspend_until {
            Some(until) if until > ctx.today => {}
            Some(_) => {
                return Err(CoreError::Validation(
                    "suspend_until must be a future date".into(),
                ))
            }
            None => {
                return Err(CoreError::Validation(
                    "suspend_until is required for a suspension".into(),
                ))
            }
        },
        MembershipAction::Reactivate if ctx.overdue_bills > 0 => {
            return Err(CoreError::Conflict(format!(
                "Membership has {} overdue bill(s); settle them before reactivating",
                ctx.overdue_bills
            )));
        }
        _ => {}
    }

    Ok(target)
}

/// Format a membership code from its database id, e.g. `M-000042`.
pub fn membership_code(id: i64) -> String {
    format!("M-{id:06}")
}

/// Whole months elapsed between `start` and `today` (0 if `today < start`).
pub fn months_between(start: NaiveDate, today: NaiveDate) -> i32 {
    if today < start {
        return 0;
    }
    let mut months =
        (today.year() - start.year()) * 12 + today.month() as i32 - start.month() as i32;
    if today.day() < start.day() {
        months -= 1;
    }
    months.max(0)
}

/// Validate a relationship value.
pub fn validate_relationship(relationship: &str) -> Result<(), CoreError> {
    if VALID_RELATIONSHIPS.contains(&relationship) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid relationship '{relationship}'. Must be one of: {}",
            VALID_RELATIONSHIPS.join(", ")
        )))
    }
}

/// A membership may hold at most `max_dependents` non-titular members.
pub fn ensure_dependent_slot(current_dependents: i64, max_dependents: i32) -> Result<(), CoreError> {
    if current_dependents >= max_dependents as i64 {
        return Err(CoreError::Conflict(format!(
            "Membership already has the maximum of {max_dependents} dependent(s)"
        )));
    }
    Ok(())
}

/// New members and reservations require an active membership.
pub fn ensure_active(state: MembershipState) -> Result<(), CoreError> {
    if state != MembershipState::Active {
        return Err(CoreError::Conflict(format!("Membership is {state}")));
    }
    Ok(())
}
