//! Errors returned by the validation engine

use super::RuleFault;

/// Error returned by engine entry points.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// No validation target was supplied.
    #[error("Validation target is missing")]
    MissingTarget,

    /// A rule set could not be built from its description.
    #[error("Invalid rule set: {0}")]
    InvalidRuleSet(String),

    /// A section name was referenced that was never created.
    #[error("Section '{name}' does not exist")]
    UnknownSection { name: String },

    /// A rule predicate faulted while evaluating a field.
    #[error("Rule '{rule}' faulted: {source}")]
    Rule {
        rule: String,
        #[source]
        source: RuleFault,
    },

    /// Async validation was cancelled before it completed.
    #[error("Validation was cancelled")]
    Cancelled,
}

impl ValidationError {
    /// Creates an unknown section error.
    pub fn unknown_section(name: impl Into<String>) -> Self {
        Self::UnknownSection { name: name.into() }
    }

    /// Wraps a rule fault with the name of the rule that raised it.
    pub fn rule(rule: impl Into<String>, source: RuleFault) -> Self {
        Self::Rule {
            rule: rule.into(),
            source,
        }
    }

    /// Configuration mistakes made by the caller, as opposed to faults raised
    /// while evaluating rules.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingTarget | Self::InvalidRuleSet(_) | Self::UnknownSection { .. }
        )
    }

    /// The fault behind a rule error, if any.
    pub fn rule_fault(&self) -> Option<&RuleFault> {
        match self {
            Self::Rule { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
