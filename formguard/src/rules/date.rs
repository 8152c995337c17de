//! Calendar rules: `date` and `birthdate`.

use std::sync::LazyLock;

use chrono::{Local, Months, NaiveDate};
use regex::Regex;

use crate::value::Value;

/// Oldest age accepted by the `birthdate` rule.
pub const MAX_AGE_YEARS: u32 = 120;

static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4}|[0-9]{2})$").expect("date shape pattern is valid")
});

/// Parse `MM/DD/YYYY` (or `MM/DD/YY`) into a calendar date.
///
/// Month and day must be exactly two digits. The year is taken literally, so
/// `YY` is a year in the first century; year zero is rejected. Day ranges
/// follow the month and leap years of that year.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_SHAPE.captures(text)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    if year <= 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Not in the future and not older than [`MAX_AGE_YEARS`].
pub fn is_plausible_birthdate(date: NaiveDate, today: NaiveDate) -> bool {
    let oldest = today
        .checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
        .unwrap_or(NaiveDate::MIN);
    date <= today && date >= oldest
}

/// `date` rule: empty values pass, anything else must parse.
pub fn date(param: &Value, value: &Value) -> bool {
    if !param.is_truthy() || value.is_empty() {
        return true;
    }
    value.as_text().and_then(|text| parse_date(&text)).is_some()
}

/// `birthdate` rule: a valid date that is a plausible date of birth today.
pub fn birthdate(param: &Value, value: &Value) -> bool {
    birthdate_on(param, value, Local::now().date_naive())
}

pub(crate) fn birthdate_on(param: &Value, value: &Value, today: NaiveDate) -> bool {
    if !param.is_truthy() || value.is_empty() {
        return true;
    }
    value
        .as_text()
        .and_then(|text| parse_date(&text))
        .is_some_and(|born| is_plausible_birthdate(born, today))
}
