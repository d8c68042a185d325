//! Bill arithmetic and bill status rules.
//!
//! All amounts are integer cents and all rates are whole percentages in
//! `0..=100`. Percentage products round half-up to the nearest cent.

use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;
use crate::status::{BillStatus, MembershipState};
use crate::types::Cents;

/// Bill kind for the monthly membership fee.
pub const KIND_MONTHLY_FEE: &str = "monthly_fee";
/// Bill kind for the one-time admission fee charged on approval.
pub const KIND_ADMISSION: &str = "admission";
/// Bill kind for a paid space reservation.
pub const KIND_RESERVATION: &str = "reservation";
/// Bill kind for a paid event inscription.
pub const KIND_EVENT: &str = "event";
/// Bill kind for manually issued charges.
pub const KIND_OTHER: &str = "other";

/// All valid bill kinds.
pub const VALID_KINDS: &[&str] = &[
    KIND_MONTHLY_FEE,
    KIND_ADMISSION,
    KIND_RESERVATION,
    KIND_EVENT,
    KIND_OTHER,
];

/// Largest unit price accepted on a bill line.
pub const MAX_UNIT_PRICE_CENTS: Cents = 1_000_000_000;

/// Days between issue and due date for bills that are not monthly fees.
pub const DEFAULT_PAYMENT_TERM_DAYS: i64 = 15;

/// Apply a whole percentage to an amount, rounding half-up.
pub fn percent_of(amount: Cents, percent: i32) -> Cents {
    let product = amount as i128 * percent as i128;
    let rounded = if product >= 0 {
        (product + 50) / 100
    } else {
        (product - 50) / 100
    };
    rounded as Cents
}

/// Validate a whole percentage.
pub fn validate_percent(field: &str, percent: i32) -> Result<(), CoreError> {
    if !(0..=100).contains(&percent) {
        return Err(CoreError::Validation(format!(
            "{field} must be between 0 and 100, got {percent}"
        )));
    }
    Ok(())
}

/// Validate a bill kind string.
pub fn validate_kind(kind: &str) -> Result<(), CoreError> {
    if VALID_KINDS.contains(&kind) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid bill kind '{kind}'. Must be one of: {}",
            VALID_KINDS.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Line items and totals
// ---------------------------------------------------------------------------

/// Computed amounts for a single bill detail line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub gross: Cents,
    pub discount: Cents,
    pub net: Cents,
}

/// Compute a detail line: `quantity * unit_price`, minus the line discount.
pub fn line_amount(
    quantity: i32,
    unit_price_cents: Cents,
    discount_percent: i32,
) -> Result<LineAmount, CoreError> {
    if quantity < 1 {
        return Err(CoreError::Validation(format!(
            "quantity must be at least 1, got {quantity}"
        )));
    }
    if !(0..=MAX_UNIT_PRICE_CENTS).contains(&unit_price_cents) {
        return Err(CoreError::Validation(format!(
            "unit_price_cents must be between 0 and {MAX_UNIT_PRICE_CENTS}"
        )));
    }
    validate_percent("discount_percent", discount_percent)?;

    let gross = unit_price_cents
        .checked_mul(quantity as Cents)
        .ok_or_else(|| CoreError::Validation("Line amount overflows".into()))?;
    let discount = percent_of(gross, discount_percent);
    Ok(LineAmount {
        gross,
        discount,
        net: gross - discount,
    })
}

/// Aggregated bill amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BillTotals {
    pub subtotal: Cents,
    pub discount: Cents,
    pub mora: Cents,
    pub total: Cents,
}

/// Sum detail lines and add the mora surcharge.
pub fn compute_totals(lines: &[LineAmount], mora_cents: Cents) -> Result<BillTotals, CoreError> {
    let overflow = || CoreError::Validation("Bill total overflows".into());
    let subtotal = checked_sum(lines.iter().map(|l| l.gross)).ok_or_else(overflow)?;
    let discount = checked_sum(lines.iter().map(|l| l.discount)).ok_or_else(overflow)?;
    let total = (subtotal - discount)
        .checked_add(mora_cents)
        .ok_or_else(overflow)?;
    Ok(BillTotals {
        subtotal,
        discount,
        mora: mora_cents,
        total,
    })
}

fn checked_sum(mut amounts: impl Iterator<Item = Cents>) -> Option<Cents> {
    amounts.try_fold(0, |acc: Cents, amount| acc.checked_add(amount))
}

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// Monthly fee owed by a membership in the given state.
///
/// Suspended memberships pay `suspended_fee_percent` of the fee;
/// disaffiliated memberships are not billed.
pub fn monthly_fee_cents(
    monthly_fee: Cents,
    state: MembershipState,
    suspended_fee_percent: i32,
) -> Option<Cents> {
    match state {
        MembershipState::Active => Some(monthly_fee),
        MembershipState::Suspended => Some(percent_of(monthly_fee, suspended_fee_percent)),
        MembershipState::Disaffiliated => None,
    }
}

/// Late-payment surcharge on an overdue bill.
///
/// Computed on the net amount (before any previous mora) so repeated
/// sweeps never compound.
pub fn mora_cents(net_total: Cents, mora_rate_percent: i32) -> Cents {
    percent_of(net_total.max(0), mora_rate_percent)
}

/// Refund owed when a paid charge is cancelled.
pub fn devolution_cents(paid_total: Cents, devolution_rate_percent: i32) -> Cents {
    percent_of(paid_total.max(0), devolution_rate_percent)
}

/// A membership is delinquent once it accumulates `threshold` overdue bills.
/// A threshold of zero disables the check.
pub fn is_delinquent(overdue_count: i64, threshold: i32) -> bool {
    threshold > 0 && overdue_count >= threshold as i64
}

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

/// First day of the month containing `date`.
pub fn period_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Due date for a monthly period: `due_day` of that month, clamped to the
/// last day of the month.
pub fn due_date(period: NaiveDate, due_day: i32) -> NaiveDate {
    let start = period_start(period);
    let last_day = last_day_of_month(start);
    let day = (due_day.max(1) as u32).min(last_day);
    start.with_day(day).unwrap_or(start)
}

fn last_day_of_month(start: NaiveDate) -> u32 {
    let (year, month) = if start.month() == 12 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

// ---------------------------------------------------------------------------
// Status rules
// ---------------------------------------------------------------------------

fn status_of(status_id: i16) -> Result<BillStatus, CoreError> {
    BillStatus::from_id(status_id)
        .ok_or_else(|| CoreError::Internal(format!("Unknown bill status id {status_id}")))
}

/// Only pending or overdue bills can be paid.
pub fn ensure_payable(status_id: i16) -> Result<(), CoreError> {
    match status_of(status_id)? {
        BillStatus::Pending | BillStatus::Overdue => Ok(()),
        other => Err(CoreError::Conflict(format!(
            "Bill is {other} and cannot be paid"
        ))),
    }
}

/// Any bill that is not already cancelled can be cancelled.
pub fn ensure_cancellable(status_id: i16) -> Result<(), CoreError> {
    match status_of(status_id)? {
        BillStatus::Cancelled => Err(CoreError::Conflict("Bill is already cancelled".into())),
        _ => Ok(()),
    }
}

/// Details may only change while the bill is still owed.
pub fn ensure_editable(status_id: i16) -> Result<(), CoreError> {
    match status_of(status_id)? {
        BillStatus::Pending | BillStatus::Overdue => Ok(()),
        other => Err(CoreError::Conflict(format!(
            "Bill is {other} and can no longer be modified"
        ))),
    }
}

/// Only pending bills move to overdue.
pub fn ensure_overdue_candidate(status_id: i16) -> Result<(), CoreError> {
    match status_of(status_id)? {
        BillStatus::Pending => Ok(()),
        other => Err(CoreError::Conflict(format!(
            "Bill is {other} and cannot become overdue"
        ))),
    }
}

/// Devolution owed when cancelling a bill in `status_id` with `total`.
pub fn cancellation_devolution(
    status_id: i16,
    total: Cents,
    devolution_rate_percent: i32,
) -> Result<Cents, CoreError> {
    ensure_cancellable(status_id)?;
    if status_id == BillStatus::Paid.id() {
        Ok(devolution_cents(total, devolution_rate_percent))
    } else {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent_of(1000, 15), 150);
        assert_eq!(percent_of(333, 50), 167);
        assert_eq!(percent_of(1, 49), 0);
        assert_eq!(percent_of(1, 50), 1);
    }

    #[test]
    fn line_amount_applies_discount() {
        let line = line_amount(3, 2500, 10).unwrap();
        assert_eq!(line.gross, 7500);
        assert_eq!(line.discount, 750);
        assert_eq!(line.net, 6750);
    }

    #[test]
    fn line_amount_rejects_bad_input() {
        assert_matches!(line_amount(0, 100, 0), Err(CoreError::Validation(_)));
        assert_matches!(line_amount(1, -1, 0), Err(CoreError::Validation(_)));
        assert_matches!(line_amount(1, 100, 101), Err(CoreError::Validation(_)));
    }

    #[test]
    fn totals_include_mora() {
        let lines = [
            line_amount(1, 10_000, 20).unwrap(),
            line_amount(2, 500, 0).unwrap(),
        ];
        let totals = compute_totals(&lines, 450).unwrap();
        assert_eq!(totals.subtotal, 11_000);
        assert_eq!(totals.discount, 2_000);
        assert_eq!(totals.mora, 450);
        assert_eq!(totals.total, 9_450);
    }

    #[test]
    fn totals_of_empty_bill_are_zero() {
        assert_eq!(compute_totals(&[], 0).unwrap(), BillTotals::default());
    }

    #[test]
    fn totals_overflow_is_an_error() {
        let half = LineAmount {
            gross: Cents::MAX / 2 + 1,
            discount: 0,
            net: Cents::MAX / 2 + 1,
        };
        assert_matches!(
            compute_totals(&[half, half], 0),
            Err(CoreError::Validation(msg)) if msg.contains("overflows")
        );
        let line = line_amount(1, 1_000, 0).unwrap();
        assert_matches!(compute_totals(&[line], Cents::MAX), Err(CoreError::Validation(_)));
    }

    #[test]
    fn unit_price_is_capped() {
        assert!(line_amount(10_000, MAX_UNIT_PRICE_CENTS, 0).is_ok());
        assert_matches!(
            line_amount(1, MAX_UNIT_PRICE_CENTS + 1, 0),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn monthly_fee_depends_on_state() {
        assert_eq!(
            monthly_fee_cents(20_000, MembershipState::Active, 50),
            Some(20_000)
        );
        assert_eq!(
            monthly_fee_cents(20_000, MembershipState::Suspended, 25),
            Some(5_000)
        );
        assert_eq!(
            monthly_fee_cents(20_000, MembershipState::Disaffiliated, 25),
            None
        );
    }

    #[test]
    fn mora_and_devolution_use_rates() {
        assert_eq!(mora_cents(10_000, 5), 500);
        assert_eq!(mora_cents(-10, 5), 0);
        assert_eq!(devolution_cents(30_000, 80), 24_000);
    }

    #[test]
    fn delinquency_threshold() {
        assert!(!is_delinquent(2, 3));
        assert!(is_delinquent(3, 3));
        assert!(!is_delinquent(10, 0));
    }

    #[test]
    fn due_date_is_clamped_to_month_end() {
        assert_eq!(due_date(date(2026, 2, 17), 31), date(2026, 2, 28));
        assert_eq!(due_date(date(2024, 2, 1), 30), date(2024, 2, 29));
        assert_eq!(due_date(date(2026, 12, 5), 10), date(2026, 12, 10));
        assert_eq!(due_date(date(2026, 4, 1), 0), date(2026, 4, 1));
    }

    #[test]
    fn period_start_is_first_of_month() {
        assert_eq!(period_start(date(2026, 10, 18)), date(2026, 10, 1));
    }

    #[test]
    fn payable_only_when_owed() {
        assert!(ensure_payable(BillStatus::Pending.id()).is_ok());
        assert!(ensure_payable(BillStatus::Overdue.id()).is_ok());
        assert_matches!(
            ensure_payable(BillStatus::Paid.id()),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            ensure_payable(BillStatus::Cancelled.id()),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(ensure_payable(42), Err(CoreError::Internal(_)));
    }

    #[test]
    fn only_pending_bills_become_overdue() {
        assert!(ensure_overdue_candidate(BillStatus::Pending.id()).is_ok());
        assert_matches!(
            ensure_overdue_candidate(BillStatus::Overdue.id()),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            ensure_overdue_candidate(BillStatus::Paid.id()),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn cancelling_paid_bill_yields_devolution() {
        assert_eq!(
            cancellation_devolution(BillStatus::Paid.id(), 10_000, 70).unwrap(),
            7_000
        );
        assert_eq!(
            cancellation_devolution(BillStatus::Pending.id(), 10_000, 70).unwrap(),
            0
        );
        assert_matches!(
            cancellation_devolution(BillStatus::Cancelled.id(), 10_000, 70),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn kinds_are_validated() {
        assert!(validate_kind(KIND_EVENT).is_ok());
        assert_matches!(validate_kind("donation"), Err(CoreError::Validation(_)));
    }
}
