//! The validation engine.
//!
//! An [`Engine`] owns the rule registry, the section tree and the table of
//! bound fields. Every entry point takes a [`Target`] and resolves it into a
//! de-duplicated, ordered list of fields before evaluating them.
//!
//! # Example
//!
//! ```
//! use formguard::{Engine, Observable, RuleSet, Value};
//!
//! let engine = Engine::new();
//! let name = Observable::new(Value::Null);
//! engine.bind(&name, RuleSet::new().rule("required", true).in_section("profile"));
//!
//! assert_eq!(engine.is_valid("profile"), Ok(false));
//! name.set(Value::from("Ada"));
//! assert_eq!(engine.is_valid("profile"), Ok(true));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::combinator::{Pending, all_settled_with};
use crate::config::EngineConfig;
use crate::error::{Result, ValidationError};
use crate::field::{FieldId, FieldValidator};
use crate::observable::Observable;
use crate::result::ValidationResult;
use crate::rules::{RuleRegistry, RuleSet, ValidatorDefinition};
use crate::section::{Gate, ResolvedField, ResolvedFields, Section, SectionTree};
use crate::sync::lock;
use crate::target::Target;
use crate::value::Value;

/// Validation engine: rule registry, section tree and bound fields.
pub struct Engine {
    config: EngineConfig,
    registry: RuleRegistry,
    sections: SectionTree,
    fields: Mutex<IndexMap<FieldId, FieldValidator>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the built-in rules and default config.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the built-in rules and the given config.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(config, RuleRegistry::with_builtins())
    }

    /// Create an engine around an existing registry.
    pub fn with_registry(config: EngineConfig, registry: RuleRegistry) -> Self {
        Self {
            config,
            registry,
            sections: SectionTree::new(),
            fields: Mutex::new(IndexMap::new()),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The rule registry shared with every bound field.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// The section tree.
    pub fn sections(&self) -> &SectionTree {
        &self.sections
    }

    /// Register a rule, returning the definition it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        definition: ValidatorDefinition,
    ) -> Option<Arc<ValidatorDefinition>> {
        self.registry.register(name, definition)
    }

    /// Bind rules to an observable.
    ///
    /// The first bind creates the field. Later binds merge their rules into
    /// the existing set, so binding twice is the same as binding once with the
    /// union. A `section` tag places the field in that section.
    pub fn bind(&self, observable: &Observable<Value>, mut rules: RuleSet) -> FieldValidator {
        let section = rules.take_section();
        let field = lock(&self.fields)
            .entry(observable.id())
            .or_insert_with(|| {
                log::trace!("Field {} bound", observable.id());
                FieldValidator::new(observable.clone(), self.registry.clone())
            })
            .clone();
        field.merge_rules(&rules);

        if let Some(section) = section {
            field.add_section(&section);
            self.sections.get_or_create(&section).add_field(&field);
            log::debug!("Field {} placed in section '{}'", field.id(), section);
        }
        field
    }

    /// Bind rules described as a JSON object, such as
    /// `{"required": true, "section": "profile"}`.
    pub fn bind_json(&self, observable: &Observable<Value>, rules: &str) -> Result<FieldValidator> {
        Ok(self.bind(observable, RuleSet::from_json_str(rules)?))
    }

    /// The field bound to an observable, if any.
    pub fn field(&self, observable: &Observable<Value>) -> Option<FieldValidator> {
        lock(&self.fields).get(&observable.id()).cloned()
    }

    /// Every bound field in binding order.
    pub fn fields(&self) -> Vec<FieldValidator> {
        lock(&self.fields).values().cloned().collect()
    }

    /// A section by name, if it exists.
    pub fn section(&self, name: &str) -> Option<Section> {
        self.sections.get(name)
    }

    /// Gate a section with a static flag or an observable flag.
    pub fn add_variable_validation(&self, section: &str, gate: impl Into<Gate>) {
        self.sections.set_conditional_validation(section, gate);
    }

    /// Link `child` under `parent`, creating either section if needed.
    pub fn add_section_child(&self, parent: &str, child: &str) {
        self.sections.add_child(parent, child);
    }

    /// Add rules inherited by the fields placed directly in `section`.
    pub fn add_section_validators(&self, section: &str, rules: RuleSet) {
        self.sections.add_inherited_rules(section, &rules);
    }

    /// Expand a target into the fields it covers, in first-seen order.
    pub fn resolve(&self, target: impl Into<Target>) -> Result<Vec<FieldValidator>> {
        Ok(self
            .resolve_inherited(target)?
            .into_iter()
            .map(|resolved| resolved.field)
            .collect())
    }

    /// Like [`resolve`](Self::resolve), keeping the rules each field inherits
    /// from the sections it was reached through.
    pub fn resolve_inherited(&self, target: impl Into<Target>) -> Result<Vec<ResolvedField>> {
        let mut out = ResolvedFields::new();
        self.resolve_into(target.into(), &mut HashSet::new(), &mut out)?;
        log::trace!("Target resolved to {} field(s)", out.len());
        Ok(out.into_values().collect())
    }

    fn resolve_into(
        &self,
        target: Target,
        visited: &mut HashSet<String>,
        out: &mut ResolvedFields,
    ) -> Result<()> {
        match target {
            Target::Missing => Err(ValidationError::MissingTarget),
            Target::Field(field) => {
                out.entry(field.id())
                    .or_insert_with(|| ResolvedField::direct(field));
                Ok(())
            }
            Target::Collection(observables) => {
                let fields = lock(&self.fields);
                for field in observables.iter().filter_map(|o| fields.get(&o.id())) {
                    out.entry(field.id())
                        .or_insert_with(|| ResolvedField::direct(field.clone()));
                }
                Ok(())
            }
            Target::Section(name) => {
                self.sections
                    .resolve_into(&name, self.config.unknown_sections, visited, out)
            }
            Target::List(targets) => {
                for target in targets {
                    self.resolve_into(target, visited, out)?;
                }
                Ok(())
            }
        }
    }

    /// Activate every field in the target and report whether all are valid.
    ///
    /// Only synchronous rules run. A faulting rule stops evaluation and is
    /// returned as an error.
    pub fn is_valid(&self, target: impl Into<Target>) -> Result<bool> {
        let mut valid = true;
        for resolved in self.resolve_inherited(target)? {
            valid &= resolved.field.activate_with(&resolved.inherited)?;
        }
        Ok(valid)
    }

    /// Like [`is_valid`](Self::is_valid), returning the failing fields.
    pub fn validate(&self, target: impl Into<Target>) -> Result<ValidationResult> {
        let resolved = self.resolve_inherited(target)?;
        for entry in &resolved {
            entry.field.activate_with(&entry.inherited)?;
        }
        Ok(ValidationResult::collect(resolved.iter().map(|entry| &entry.field)))
    }

    /// Activate every field in the target, running sync and async rules.
    ///
    /// Resolves once every field's async rules have finished, so each field
    /// ends up with its final error state.
    pub async fn is_valid_async(&self, target: impl Into<Target>) -> Result<bool> {
        self.is_valid_async_with(target, &CancellationToken::new())
            .await
    }

    /// [`is_valid_async`](Self::is_valid_async) with a cancellation token.
    ///
    /// Cancelling resolves to [`ValidationError::Cancelled`]. Async rules that
    /// were still running are dropped; fields keep whatever state their
    /// synchronous rules produced.
    pub async fn is_valid_async_with(
        &self,
        target: impl Into<Target>,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let pending: Vec<Pending> = self
            .resolve_inherited(target)?
            .iter()
            .map(|entry| Pending::from_future(entry.field.activate_async_with(&entry.inherited)))
            .collect();
        all_settled_with(pending, cancel).await
    }

    /// Deactivate every field in the target. Section gates are untouched.
    pub fn deactivate(&self, target: impl Into<Target>) -> Result<()> {
        for field in self.resolve(target)? {
            field.deactivate();
        }
        Ok(())
    }

    /// Validate a single section by name.
    #[deprecated(note = "use `is_valid` with a section target")]
    pub fn is_section_valid(&self, name: &str) -> Result<bool> {
        if self.config.deprecation_warnings {
            log::warn!("is_section_valid is deprecated; use is_valid(\"{}\")", name);
        }
        self.is_valid(Target::section(name))
    }

    /// Deactivate every bound field and forget all fields and sections.
    ///
    /// Registered rules are kept.
    pub fn reset(&self) {
        let fields: Vec<FieldValidator> = lock(&self.fields).drain(..).map(|(_, f)| f).collect();
        for field in &fields {
            field.deactivate();
        }
        self.sections.clear();
        log::debug!("Engine reset; {} field(s) released", fields.len());
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("rules", &self.registry.len())
            .field("fields", &lock(&self.fields).len())
            .field("sections", &self.sections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownSectionPolicy;

    #[test]
    fn test_rebinding_reuses_field() {
        let engine = Engine::new();
        let v = Observable::new(Value::Null);
        let first = engine.bind(&v, RuleSet::new().rule("required", true));
        let second = engine.bind(&v, RuleSet::new().rule("minLength", 3).in_section("s"));
        assert_eq!(first, second);
        assert_eq!(first.rules().names(), vec!["required", "minLength"]);
        assert_eq!(first.sections(), vec!["s"]);
        assert_eq!(engine.fields().len(), 1);
    }

    #[test]
    fn test_resolve_dedups_in_first_seen_order() {
        let engine = Engine::new();
        let a = Observable::new(Value::Null);
        let b = Observable::new(Value::Null);
        let fa = engine.bind(&a, RuleSet::new().in_section("s"));
        let fb = engine.bind(&b, RuleSet::new().in_section("s"));

        let fields = engine
            .resolve(Target::list([
                Target::from(&b),
                Target::from("s"),
                Target::from(&fa),
            ]))
            .unwrap();
        assert_eq!(fields, vec![fb, fa]);
    }

    #[test]
    fn test_unbound_collection_members_are_ignored() {
        let engine = Engine::new();
        let bound = Observable::new(Value::Null);
        let loose = Observable::new(Value::Null);
        engine.bind(&bound, RuleSet::new().rule("required", true));

        assert!(engine.resolve(vec![loose.clone()]).unwrap().is_empty());
        assert_eq!(engine.is_valid([bound, loose]), Ok(false));
    }

    #[test]
    fn test_missing_target() {
        let engine = Engine::new();
        assert_eq!(engine.is_valid(Target::Missing), Err(ValidationError::MissingTarget));
        assert_eq!(
            engine.deactivate(None::<&str>),
            Err(ValidationError::MissingTarget)
        );
    }

    #[test]
    fn test_strict_config_rejects_unknown_sections() {
        let engine = Engine::with_config(EngineConfig::strict());
        assert_eq!(engine.config().unknown_sections, UnknownSectionPolicy::Fail);
        assert_eq!(
            engine.is_valid("nowhere"),
            Err(ValidationError::unknown_section("nowhere"))
        );
        assert_eq!(Engine::new().is_valid("nowhere"), Ok(true));
    }

    #[test]
    fn test_reset_keeps_rules() {
        let engine = Engine::new();
        engine.register("custom", ValidatorDefinition::new(|_, _| true, "never"));
        let v = Observable::new(Value::Null);
        let field = engine.bind(&v, RuleSet::new().rule("required", true).in_section("s"));
        field.activate().unwrap();

        engine.reset();
        assert!(!field.is_active());
        assert!(engine.field(&v).is_none());
        assert!(engine.section("s").is_none());
        assert!(engine.registry().contains("custom"));
    }

    #[test]
    #[allow(deprecated)]
    fn test_is_section_valid_delegates() {
        let engine = Engine::with_config(EngineConfig::new().with_deprecation_warnings(false));
        let v = Observable::new(Value::Null);
        engine.bind(&v, RuleSet::new().rule("required", true).in_section("s"));
        assert_eq!(engine.is_section_valid("s"), Ok(false));
        v.set(Value::from("x"));
        assert_eq!(engine.is_section_valid("s"), Ok(true));
    }
}
