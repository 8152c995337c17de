//! Rule sets: ordered rule name → parameter mappings.

use indexmap::IndexMap;

use crate::error::ValidationError;
use crate::observable::MaybeObservable;
use crate::value::Value;

/// Reserved rule-set key naming the section a field belongs to.
pub const SECTION_KEY: &str = "section";

/// A rule parameter: static, or read from an observable at evaluation time.
pub type RuleParam = MaybeObservable<Value>;

/// Ordered mapping of rule names to parameters, plus an optional section tag.
///
/// Rules are evaluated in insertion order. Inserting a name that is already
/// present replaces its parameter but keeps its position.
///
/// # Example
///
/// ```
/// use formguard::RuleSet;
///
/// let rules = RuleSet::new()
///     .rule("required", true)
///     .rule("maxLength", 20)
///     .in_section("profile");
/// assert_eq!(rules.names(), vec!["required", "maxLength"]);
/// assert_eq!(rules.section(), Some("profile"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: IndexMap<String, RuleParam>,
    section: Option<String>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. The name `section` sets the section tag instead.
    pub fn rule(mut self, name: impl Into<String>, param: impl Into<RuleParam>) -> Self {
        self.insert(name, param);
        self
    }

    /// Tag the rule set with a section.
    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Add or replace a rule in place.
    pub fn insert(&mut self, name: impl Into<String>, param: impl Into<RuleParam>) {
        let name = name.into();
        let param = param.into();
        if name == SECTION_KEY {
            match param.get() {
                Value::Text(section) => self.section = Some(section),
                other => log::warn!(
                    "Ignoring non-text section tag of type {}",
                    other.type_name()
                ),
            }
            return;
        }
        self.rules.insert(name, param);
    }

    /// Merge `other` into this set; `other` wins on shared names.
    pub fn merge(&mut self, other: &RuleSet) {
        for (name, param) in &other.rules {
            self.rules.insert(name.clone(), param.clone());
        }
        if other.section.is_some() {
            self.section.clone_from(&other.section);
        }
    }

    /// The section tag, if any.
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// Remove and return the section tag.
    pub fn take_section(&mut self) -> Option<String> {
        self.section.take()
    }

    /// Parameter for a rule.
    pub fn get(&self, name: &str) -> Option<&RuleParam> {
        self.rules.get(name)
    }

    /// Check if a rule is present.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Rule names in evaluation order.
    pub fn names(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// Iterate rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleParam)> {
        self.rules.iter().map(|(name, param)| (name.as_str(), param))
    }

    /// Number of rules, not counting the section tag.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Build a rule set from a JSON object such as
    /// `{"required": true, "maxLength": 10, "section": "a"}`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ValidationError> {
        let serde_json::Value::Object(map) = json else {
            return Err(ValidationError::InvalidRuleSet(format!(
                "expected an object, got {json}"
            )));
        };
        let mut rules = RuleSet::new();
        for (name, param) in map {
            if name == SECTION_KEY && !param.is_string() {
                return Err(ValidationError::InvalidRuleSet(format!(
                    "section must be a string, got {param}"
                )));
            }
            rules.insert(name.as_str(), Value::from(param.clone()));
        }
        Ok(rules)
    }

    /// Parse a rule set from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ValidationError> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| ValidationError::InvalidRuleSet(e.to_string()))?;
        Self::from_json(&json)
    }
}

impl<K: Into<String>, P: Into<RuleParam>> FromIterator<(K, P)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        let mut rules = RuleSet::new();
        for (name, param) in iter {
            rules.insert(name, param);
        }
        rules
    }
}
