//! Storage and display formatters.
//!
//! Storage formatters turn accepted input into its canonical stored form and
//! are idempotent. Display formatters render stored values and tolerate a
//! missing value.

use chat_survey_types::SKIPPED;

use crate::validators::date_parts;

/// Shown in summaries for fields without a real answer.
pub const PLACEHOLDER: &str = "—";

/// Digits only, with the national trunk prefix `8` of an 11-digit number
/// rewritten to the country code `7`.
pub fn phone_digits(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('8') {
        Some(rest) if digits.len() == 11 => format!("7{rest}"),
        _ => digits,
    }
}

/// `d.m.yyyy` with day and month zero-padded. Input that is not a date is
/// returned trimmed but otherwise untouched.
pub fn date_padded(input: &str) -> String {
    match date_parts(input) {
        Some((day, month, year)) => format!("{day:02}.{month:02}.{year:04}"),
        None => input.trim().to_string(),
    }
}

pub fn trimmed(input: &str) -> String {
    input.trim().to_string()
}

pub fn lowercase(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Capitalize the first letter of every word, lowercase the rest, and collapse
/// runs of whitespace.
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip a leading `@` so handles are stored uniformly.
pub fn handle_bare(input: &str) -> String {
    input.trim().trim_start_matches('@').to_string()
}

/// The stored value, or [`PLACEHOLDER`] when there is no real answer.
pub fn or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() && value != SKIPPED => value.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// `79991234567` as `+7 (999) 123-45-67`. Numbers of other shapes are shown
/// with a leading `+` only.
pub fn phone_pretty(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.is_empty() && *v != SKIPPED) else {
        return PLACEHOLDER.to_string();
    };
    let digits = phone_digits(value);
    if digits.len() != 11 {
        return format!("+{digits}");
    }
    format!(
        "+{} ({}) {}-{}-{}",
        &digits[..1],
        &digits[1..4],
        &digits[4..7],
        &digits[7..9],
        &digits[9..]
    )
}

/// `@handle`, or the placeholder.
pub fn handle_display(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() && value != SKIPPED => format!("@{value}"),
        _ => PLACEHOLDER.to_string(),
    }
}
