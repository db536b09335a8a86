//! Deadlines are typed and shown in Moscow time (UTC+3) and stored in UTC.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::errors::AppError;

pub const INPUT_FORMAT: &str = "%d.%m.%Y %H:%M";

const LOCAL_OFFSET_HOURS: i64 = 3;

const INVALID_FORMAT: &str = "Invalid deadline format. Use DD.MM.YYYY HH:MM.";

// `%Y` alone takes signed years of any width.
static INPUT_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{4} [0-9]{1,2}:[0-9]{1,2}$").unwrap()
});

/// Parses a `DD.MM.YYYY HH:MM` local time. An empty input clears the deadline.
pub fn parse_input(text: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if !INPUT_SHAPE.is_match(text) {
        return Err(AppError::validation(INVALID_FORMAT));
    }

    let local = NaiveDateTime::parse_from_str(text, INPUT_FORMAT)
        .map_err(|_| AppError::validation(INVALID_FORMAT))?;
    let utc = local
        .checked_sub_signed(Duration::hours(LOCAL_OFFSET_HOURS))
        .ok_or_else(|| AppError::validation(INVALID_FORMAT))?;
    Ok(Some(Utc.from_utc_datetime(&utc)))
}

/// Value used to prefill the deadline field, seconds dropped.
pub fn format_input(value: &DateTime<Utc>) -> String {
    to_local(value).format(INPUT_FORMAT).to_string()
}

pub fn format_display(value: &DateTime<Utc>) -> String {
    format!("{} (MSK)", to_local(value).format(INPUT_FORMAT))
}

fn to_local(value: &DateTime<Utc>) -> NaiveDateTime {
    value.naive_utc() + Duration::hours(LOCAL_OFFSET_HOURS)
}
