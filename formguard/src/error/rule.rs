//! Faults raised while evaluating a single rule

/// A rule predicate could not produce a verdict.
///
/// Faults are never treated as a pass: the field is marked in error and the
/// fault propagates to the caller of `is_valid` / `is_valid_async`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleFault {
    /// The pattern parameter is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The parameter cannot be interpreted by the rule.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// The predicate reported a failure of its own.
    #[error("{0}")]
    Failed(String),

    /// An async callback rule dropped its completion without settling it.
    #[error("async rule finished without reporting a result")]
    Abandoned,
}

impl RuleFault {
    /// Creates an invalid pattern fault.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an invalid parameter fault.
    pub fn invalid_parameter(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Creates a fault carrying a predicate's own failure message.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
