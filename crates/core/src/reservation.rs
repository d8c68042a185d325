//! Space reservation rules: time slots, pricing, cancellation windows, and
//! inscription capacity (shared with event inscriptions).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::CoreError;
use crate::types::Cents;

/// Opening hours and limits of a space, as needed to validate a slot.
#[derive(Debug, Clone, Copy)]
pub struct SpaceHours {
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub max_hours: i32,
}

/// Validate a requested time slot against the space's opening hours.
pub fn validate_slot(start: NaiveTime, end: NaiveTime, hours: SpaceHours) -> Result<(), CoreError> {
    if start >= end {
        return Err(CoreError::Validation(
            "start_time must be before end_time".into(),
        ));
    }
    if start < hours.opens_at || end > hours.closes_at {
        return Err(CoreError::Validation(format!(
            "Reservation must fall within opening hours {}-{}",
            hours.opens_at.format("%H:%M"),
            hours.closes_at.format("%H:%M")
        )));
    }
    let minutes = (end - start).num_minutes();
    if hours.max_hours > 0 && minutes > hours.max_hours as i64 * 60 {
        return Err(CoreError::Validation(format!(
            "Reservations are limited to {} hour(s)",
            hours.max_hours
        )));
    }
    Ok(())
}

/// Reservations may not be placed on past dates.
pub fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<(), CoreError> {
    if date < today {
        return Err(CoreError::Validation(
            "reservation_date must not be in the past".into(),
        ));
    }
    Ok(())
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// Price of a slot, pro-rated per minute and rounded half-up to the cent.
pub fn reservation_total_cents(price_per_hour: Cents, start: NaiveTime, end: NaiveTime) -> Cents {
    let minutes = (end - start).num_minutes().max(0);
    let numerator = price_per_hour as i128 * minutes as i128;
    ((numerator + 30) / 60) as Cents
}

/// Whether a non-staff caller may still cancel a reservation starting at
/// `starts_at`, given the minimum notice in hours.
pub fn can_cancel(starts_at: NaiveDateTime, now: NaiveDateTime, cancel_hours: i32) -> bool {
    starts_at - now >= chrono::Duration::hours(cancel_hours as i64)
}

/// Reject a new inscription once `current` has reached `capacity`.
pub fn ensure_capacity(current: i64, capacity: i32) -> Result<(), CoreError> {
    if current >= capacity as i64 {
        return Err(CoreError::Conflict(format!(
            "Capacity of {capacity} has been reached"
        )));
    }
    Ok(())
}

/// An inscription names either a registered user or a guest, never both.
pub fn validate_inscription_target(
    user_id: Option<i64>,
    guest_name: Option<&str>,
) -> Result<(), CoreError> {
    match (user_id, guest_name.map(str::trim)) {
        (Some(_), None) => Ok(()),
        (None, Some(name)) if !name.is_empty() => Ok(()),
        (Some(_), Some(_)) => Err(CoreError::Validation(
            "Provide either user_id or guest_name, not both".into(),
        )),
        _ => Err(CoreError::Validation(
            "Either user_id or guest_name is required".into(),
        )),
    }
}
