//! Local validation rules applied before any gateway call. The backend
//! performs the authoritative checks at finalization; these exist so obviously
//! bad input never costs a round-trip.

use regex::Regex;

pub const PASSWORD_MIN_LEN: usize = 10;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Normalize an email for display and request payloads.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Composite password policy: length 10-128 with at least one uppercase
/// letter, one lowercase letter and one digit.
#[must_use]
pub fn valid_password(password: &str) -> bool {
    let length = password.chars().count();
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&length)
        && password.chars().any(|ch| ch.is_ascii_uppercase())
        && password.chars().any(|ch| ch.is_ascii_lowercase())
        && password.chars().any(|ch| ch.is_ascii_digit())
}

/// A transfer amount is acceptable when positive and within the cached
/// balance. The balance is only as fresh as the last refresh; the server
/// re-checks at finalization.
#[must_use]
pub fn valid_transfer_amount(amount: f64, available: f64) -> bool {
    amount.is_finite() && amount > 0.0 && amount <= available
}
