//! Field-level validators plugged into `#[derive(Validate)]` request types
//! via `#[validate(custom(function = "..."))]`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

/// National ID / passport numbers: 6-15 alphanumerics.
static DOCUMENT_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{6,15}$").expect("valid regex"));

/// Phone numbers: optional leading `+`, then 6-15 digits with optional
/// spaces or dashes.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}$").expect("valid regex"));

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_document_number(value: &str) -> Result<(), ValidationError> {
    if DOCUMENT_NUMBER_RE.is_match(value) {
        Ok(())
    } else {
        Err(invalid(
            "document_number",
            "must be 6 to 15 letters or digits",
        ))
    }
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(value) {
        Ok(())
    } else {
        Err(invalid("phone", "must be a valid phone number"))
    }
}

/// Rejects strings that are empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("blank", "must not be blank"))
    } else {
        Ok(())
    }
}
