//! Field validators.
//!
//! Every validator is a pure function from raw input to `Ok(())` or the
//! message shown to the user. They accept unnormalized input (surrounding
//! whitespace, phone punctuation) and can be paired with any formatter.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern is valid")
});

static HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?[A-Za-z0-9_]{5,32}$").expect("handle pattern is valid"));

static NAME_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}+(?:['-]\p{L}+)*$").expect("name pattern is valid"));

/// Characters a phone number may contain besides digits.
const PHONE_PUNCTUATION: &[char] = &['+', '-', '(', ')', ' '];

pub fn non_empty(input: &str) -> Result<(), String> {
    if input.trim().is_empty() {
        return Err("The answer cannot be empty.".to_string());
    }
    Ok(())
}

/// A phone number with 10 to 15 digits, optionally written with `+`, dashes,
/// parentheses and spaces.
pub fn phone(input: &str) -> Result<(), String> {
    let input = input.trim();
    if input
        .chars()
        .any(|c| !c.is_ascii_digit() && !PHONE_PUNCTUATION.contains(&c))
    {
        return Err("A phone number may only contain digits, spaces, +, - and brackets.".into());
    }
    let digits = input.chars().filter(char::is_ascii_digit).count();
    if !(10..=15).contains(&digits) {
        return Err(format!(
            "A phone number must have 10 to 15 digits, got {digits}."
        ));
    }
    Ok(())
}

/// Split `d.m.yyyy` into its numeric parts. Shared with the date formatter.
pub(crate) fn date_parts(input: &str) -> Option<(u32, u32, i32)> {
    let mut parts = input.trim().split('.');
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let year_raw = parts.next()?;
    if parts.next().is_some() || year_raw.len() != 4 {
        return None;
    }
    let year = year_raw.parse().ok()?;
    Some((day, month, year))
}

/// A real calendar date written as `d.m.yyyy`, between 1900 and today.
pub fn date(input: &str) -> Result<(), String> {
    let Some((day, month, year)) = date_parts(input) else {
        return Err("Please enter the date as DD.MM.YYYY, for example 01.09.2001.".into());
    };
    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
        return Err(format!("{input} is not a real date."));
    };
    let today = Local::now().date_naive();
    if date.year() < 1900 || date > today {
        return Err(format!(
            "The date must be between 1900 and {}.",
            today.format("%d.%m.%Y")
        ));
    }
    Ok(())
}

pub fn email(input: &str) -> Result<(), String> {
    if !EMAIL.is_match(input.trim()) {
        return Err("Please enter a valid e-mail address.".into());
    }
    Ok(())
}

/// Two to four words made of letters, apostrophes and hyphens.
pub fn full_name(input: &str) -> Result<(), String> {
    let words: Vec<&str> = input.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return Err("Please enter your first and last name.".into());
    }
    if let Some(word) = words.iter().find(|word| !NAME_WORD.is_match(word)) {
        return Err(format!("'{word}' does not look like a name."));
    }
    Ok(())
}

/// A channel handle such as `@alice_b`.
pub fn handle(input: &str) -> Result<(), String> {
    if !HANDLE.is_match(input.trim()) {
        return Err("A handle has 5 to 32 letters, digits or underscores.".into());
    }
    Ok(())
}

/// An integer within `min..=max`.
pub fn int_in_range(min: i64, max: i64) -> impl Fn(&str) -> Result<(), String> + Send + Sync {
    move |input| match input.trim().parse::<i64>() {
        Ok(value) if (min..=max).contains(&value) => Ok(()),
        Ok(_) => Err(format!("Please enter a number from {min} to {max}.")),
        Err(_) => Err("Please enter a whole number.".into()),
    }
}

/// At most `limit` characters (not bytes).
pub fn max_len(limit: usize) -> impl Fn(&str) -> Result<(), String> + Send + Sync {
    move |input| {
        if input.chars().count() > limit {
            return Err(format!("Please keep it under {limit} characters."));
        }
        Ok(())
    }
}

/// Exactly one of the given answers.
pub fn one_of<I, S>(options: I) -> impl Fn(&str) -> Result<(), String> + Send + Sync
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let options: Vec<String> = options.into_iter().map(Into::into).collect();
    move |input| {
        if options.iter().any(|option| option == input.trim()) {
            return Ok(());
        }
        Err(format!("Please answer one of: {}.", options.join(", ")))
    }
}

/// Accept input only if both validators accept it. The first failure wins.
pub fn both<A, B>(first: A, second: B) -> impl Fn(&str) -> Result<(), String> + Send + Sync
where
    A: Fn(&str) -> Result<(), String> + Send + Sync,
    B: Fn(&str) -> Result<(), String> + Send + Sync,
{
    move |input| {
        first(input)?;
        second(input)
    }
}
