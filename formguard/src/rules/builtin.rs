//! Built-in rules.
//!
//! Every rule is an opt-in gate: when its parameter is falsy the rule passes.
//! `minLength` and `matches` are the exceptions and always check the value.
//! Most rules also let empty values through; combine them with `required`
//! to reject empty input.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use super::definition::{RuleOutcome, ValidatorDefinition};
use super::registry::RuleRegistry;
use crate::error::RuleFault;
use crate::sync::lock;
use crate::value::Value;

pub use super::date::{birthdate, date};

pub const REQUIRED: &str = "required";
pub const NUMERIC: &str = "numeric";
pub const MAX_LENGTH: &str = "maxLength";
pub const MIN_LENGTH: &str = "minLength";
pub const MATCHES: &str = "matches";
pub const DATE: &str = "date";
pub const BIRTHDATE: &str = "birthdate";
pub const PHONE: &str = "phone";
pub const EMAIL: &str = "email";
pub const REGEX_PATTERN: &str = "regexPattern";

static PHONE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:1-?)?[2-9][0-9]{2}-?[2-9][0-9]{2}-?[0-9]{4}$").expect("phone pattern is valid")
});

/// Most patterns a `regexPattern` rule keeps compiled at once.
const PATTERN_CACHE_LIMIT: usize = 64;

static PATTERN_CACHE: LazyLock<Mutex<HashMap<String, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Register every built-in rule into `registry`.
pub fn register_all(registry: &RuleRegistry) {
    registry.register(REQUIRED, ValidatorDefinition::new(required, "This field is required"));
    registry.register(NUMERIC, ValidatorDefinition::new(numeric, "Please enter a number"));
    registry.register(
        MAX_LENGTH,
        ValidatorDefinition::fallible(max_length, "Please enter no more than {param} characters"),
    );
    registry.register(
        MIN_LENGTH,
        ValidatorDefinition::fallible(min_length, "Please enter at least {param} characters"),
    );
    registry.register(MATCHES, ValidatorDefinition::new(matches, "Values do not match"));
    registry.register(
        DATE,
        ValidatorDefinition::new(date, "Please enter a valid date (MM/DD/YYYY)"),
    );
    registry.register(
        BIRTHDATE,
        ValidatorDefinition::new(birthdate, "Please enter a valid birthdate"),
    );
    registry.register(
        PHONE,
        ValidatorDefinition::new(phone, "Please enter a valid phone number"),
    );
    registry.register(
        EMAIL,
        ValidatorDefinition::new(email, "Please enter a valid email address"),
    );
    registry.register(
        REGEX_PATTERN,
        ValidatorDefinition::fallible(regex_pattern, "Please match the requested format"),
    );
}

/// Non-null and non-empty when enabled. `false` and `"0"` count as values.
pub fn required(param: &Value, value: &Value) -> bool {
    !param.is_truthy() || !value.is_empty()
}

/// Parses as a finite number. Empty values pass.
pub fn numeric(param: &Value, value: &Value) -> bool {
    if !param.is_truthy() || value.is_empty() {
        return true;
    }
    value.as_number().is_some_and(f64::is_finite)
}

/// At most `param` characters. Empty values pass.
pub fn max_length(param: &Value, value: &Value) -> RuleOutcome {
    if !param.is_truthy() || value.is_empty() {
        return Ok(true);
    }
    Ok(value.char_len() <= length_param(param)?)
}

/// At least `param` characters. Empty and absent values fail.
pub fn min_length(param: &Value, value: &Value) -> RuleOutcome {
    if value.is_empty() {
        return Ok(false);
    }
    Ok(value.char_len() >= length_param(param)?)
}

/// Equal to `param`, comparing text projections across types.
pub fn matches(param: &Value, value: &Value) -> bool {
    param == value || (!param.is_null() && param.as_text() == value.as_text())
}

/// North-American phone number. Empty values pass.
pub fn phone(param: &Value, value: &Value) -> bool {
    if !param.is_truthy() || value.is_empty() {
        return true;
    }
    value.as_text().is_some_and(|text| PHONE_SHAPE.is_match(&text))
}

/// Email address. Empty values pass.
pub fn email(param: &Value, value: &Value) -> bool {
    if !param.is_truthy() || value.is_empty() {
        return true;
    }
    value
        .as_text()
        .is_some_and(|text| email_address::EmailAddress::is_valid(&text))
}

/// Value text contains a match for the `param` pattern. Empty values are not
/// exempt; a malformed pattern is a fault.
pub fn regex_pattern(param: &Value, value: &Value) -> RuleOutcome {
    let Some(pattern) = param.as_text() else {
        return Err(RuleFault::invalid_parameter("null", "expected a pattern"));
    };
    let re = compiled(&pattern)?;
    Ok(re.is_match(&value.as_text().unwrap_or_default()))
}

/// Compile `pattern`, reusing an earlier compilation when there is one.
///
/// The cache is emptied once it reaches [`PATTERN_CACHE_LIMIT`] entries.
/// Malformed patterns are not cached.
fn compiled(pattern: &str) -> Result<Regex, RuleFault> {
    if let Some(re) = lock(&PATTERN_CACHE).get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern).map_err(|e| RuleFault::invalid_pattern(pattern, e))?;
    let mut cache = lock(&PATTERN_CACHE);
    if cache.len() >= PATTERN_CACHE_LIMIT {
        log::debug!("Pattern cache full; clearing {} entries", cache.len());
        cache.clear();
    }
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

fn length_param(param: &Value) -> Result<usize, RuleFault> {
    match param.as_number() {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n as usize),
        _ => Err(RuleFault::invalid_parameter(
            param.to_string(),
            "expected a non-negative length",
        )),
    }
}
