//! Sections: named, hierarchical groups of fields.
//!
//! A section owns fields directly, links child sections by name, carries a
//! rule set that is merged into its own fields whenever it is resolved, and
//! has a `validate` gate. Sections are created on first reference.
//!
//! Children are stored as names, so the graph may share children between
//! parents or even contain cycles. Resolution keeps a visited set: a section
//! seen twice in one resolution contributes nothing the second time.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};

use indexmap::{IndexMap, IndexSet};

use crate::config::UnknownSectionPolicy;
use crate::error::{Result, ValidationError};
use crate::field::{FieldId, FieldValidator};
use crate::observable::{MaybeObservable, Subscription};
use crate::rules::RuleSet;
use crate::sync::{lock, read, write};

/// Gate deciding whether a section takes part in validation.
pub type Gate = MaybeObservable<bool>;

struct SectionInner {
    name: String,
    fields: RwLock<Vec<FieldValidator>>,
    children: RwLock<IndexSet<String>>,
    rules: RwLock<RuleSet>,
    gate: RwLock<Gate>,
    gate_subscription: Mutex<Option<Subscription>>,
}

/// Handle to a named section.
#[derive(Clone)]
pub struct Section {
    inner: Arc<SectionInner>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SectionInner {
                name: name.into(),
                fields: RwLock::new(Vec::new()),
                children: RwLock::new(IndexSet::new()),
                rules: RwLock::new(RuleSet::new()),
                gate: RwLock::new(Gate::default()),
                gate_subscription: Mutex::new(None),
            }),
        }
    }

    /// Section name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Fields placed directly in this section.
    pub fn fields(&self) -> Vec<FieldValidator> {
        read(&self.inner.fields).clone()
    }

    /// Names of child sections, in link order.
    pub fn children(&self) -> Vec<String> {
        read(&self.inner.children).iter().cloned().collect()
    }

    /// Rules inherited by the fields placed directly in this section.
    pub fn rules(&self) -> RuleSet {
        read(&self.inner.rules).clone()
    }

    /// Current value of the gate.
    pub fn should_validate(&self) -> bool {
        read(&self.inner.gate).get()
    }

    /// Place a field in this section. Adding the same field twice is a no-op.
    pub fn add_field(&self, field: &FieldValidator) {
        let mut fields = write(&self.inner.fields);
        if !fields.contains(field) {
            fields.push(field.clone());
        }
    }

    /// Link a child section by name. Returns `false` if already linked.
    pub fn add_child(&self, child: impl Into<String>) -> bool {
        write(&self.inner.children).insert(child.into())
    }

    /// Merge rules into the inherited rule set.
    pub fn add_rules(&self, rules: &RuleSet) {
        let mut current = write(&self.inner.rules);
        current.merge(rules);
        current.take_section();
    }

    /// Replace the gate.
    ///
    /// An observable gate is watched: whenever it turns `false`, every field
    /// placed directly in this section is deactivated right away.
    pub fn set_gate(&self, gate: impl Into<Gate>) {
        let gate = gate.into();
        let subscription = match &gate {
            Gate::Observable(flag) => {
                let weak: Weak<SectionInner> = Arc::downgrade(&self.inner);
                Some(flag.subscribe(move |validate| {
                    if *validate {
                        return;
                    }
                    if let Some(inner) = weak.upgrade() {
                        Section { inner }.deactivate_own_fields();
                    }
                }))
            }
            Gate::Value(_) => None,
        };
        *write(&self.inner.gate) = gate;
        // Replacing the previous subscription drops it.
        *lock(&self.inner.gate_subscription) = subscription;
    }

    /// Deactivate the fields placed directly in this section.
    pub fn deactivate_own_fields(&self) {
        log::debug!("Section '{}' gated off; deactivating its fields", self.name());
        for field in self.fields() {
            field.deactivate();
        }
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.inner.name)
            .field("fields", &read(&self.inner.fields).len())
            .field("children", &self.children())
            .field("validate", &self.should_validate())
            .finish()
    }
}

/// A field reached by resolution, with the rules it inherits from the
/// sections that own it.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// The field.
    pub field: FieldValidator,
    /// Section rules layered under the field's own rules.
    pub inherited: RuleSet,
}

impl ResolvedField {
    pub(crate) fn direct(field: FieldValidator) -> Self {
        Self {
            field,
            inherited: RuleSet::new(),
        }
    }
}

/// Fields collected by resolution, de-duplicated in first-seen order.
pub type ResolvedFields = IndexMap<FieldId, ResolvedField>;

/// All sections known to an engine, keyed by name.
#[derive(Default)]
pub struct SectionTree {
    sections: Mutex<IndexMap<String, Section>>,
}

impl SectionTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a section, creating it empty if needed.
    pub fn get_or_create(&self, name: &str) -> Section {
        lock(&self.sections)
            .entry(name.to_string())
            .or_insert_with(|| {
                log::trace!("Section '{}' created", name);
                Section::new(name)
            })
            .clone()
    }

    /// Look up an existing section.
    pub fn get(&self, name: &str) -> Option<Section> {
        lock(&self.sections).get(name).cloned()
    }

    /// Check if a section exists.
    pub fn contains(&self, name: &str) -> bool {
        lock(&self.sections).contains_key(name)
    }

    /// Section names in creation order.
    pub fn names(&self) -> Vec<String> {
        lock(&self.sections).keys().cloned().collect()
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        lock(&self.sections).len()
    }

    /// Check if there are no sections.
    pub fn is_empty(&self) -> bool {
        lock(&self.sections).is_empty()
    }

    /// Link `child` under `parent`, creating either if needed.
    pub fn add_child(&self, parent: &str, child: &str) {
        self.get_or_create(child);
        if self.get_or_create(parent).add_child(child) {
            log::debug!("Section '{}' linked under '{}'", child, parent);
        }
    }

    /// Set a section's gate, creating the section if needed.
    pub fn set_conditional_validation(&self, name: &str, gate: impl Into<Gate>) {
        self.get_or_create(name).set_gate(gate);
    }

    /// Merge rules into a section's inherited rules, creating it if needed.
    pub fn add_inherited_rules(&self, name: &str, rules: &RuleSet) {
        self.get_or_create(name).add_rules(rules);
    }

    /// Remove every section, dropping gate subscriptions.
    pub fn clear(&self) {
        lock(&self.sections).clear();
    }

    /// Expand a section into the fields that should be validated.
    pub fn resolve(&self, name: &str, policy: UnknownSectionPolicy) -> Result<Vec<FieldValidator>> {
        Ok(self
            .resolve_inherited(name, policy)?
            .into_iter()
            .map(|resolved| resolved.field)
            .collect())
    }

    /// Like [`resolve`](Self::resolve), keeping the rules each field inherits.
    pub fn resolve_inherited(
        &self,
        name: &str,
        policy: UnknownSectionPolicy,
    ) -> Result<Vec<ResolvedField>> {
        let mut out = ResolvedFields::new();
        self.resolve_into(name, policy, &mut HashSet::new(), &mut out)?;
        Ok(out.into_values().collect())
    }

    /// Resolve `name` into `out`, sharing `visited` with the caller.
    ///
    /// A gated-off section deactivates its own fields and contributes
    /// nothing, children included. Otherwise its own fields are added with
    /// the section's rules folded into their inherited set, followed by each
    /// child. The fields' own rule sets are never modified.
    pub(crate) fn resolve_into(
        &self,
        name: &str,
        policy: UnknownSectionPolicy,
        visited: &mut HashSet<String>,
        out: &mut ResolvedFields,
    ) -> Result<()> {
        if !visited.insert(name.to_string()) {
            log::trace!("Section '{}' already visited in this resolution", name);
            return Ok(());
        }
        let Some(section) = self.get(name) else {
            return match policy {
                UnknownSectionPolicy::Warn => {
                    log::warn!("Section '{}' does not exist; treating it as empty", name);
                    Ok(())
                }
                UnknownSectionPolicy::Fail => Err(ValidationError::unknown_section(name)),
            };
        };

        if !section.should_validate() {
            section.deactivate_own_fields();
            return Ok(());
        }

        let rules = section.rules();
        for field in section.fields() {
            out.entry(field.id())
                .or_insert_with(|| ResolvedField::direct(field))
                .inherited
                .merge(&rules);
        }
        for child in section.children() {
            self.resolve_into(&child, policy, visited, out)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SectionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionTree")
            .field("sections", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;
    use crate::rules::RuleRegistry;
    use crate::value::Value;

    fn field_in(tree: &SectionTree, section: &str, value: impl Into<Value>) -> FieldValidator {
        let field = FieldValidator::new(Observable::new(value.into()), RuleRegistry::with_builtins());
        tree.get_or_create(section).add_field(&field);
        field
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let tree = SectionTree::new();
        tree.get_or_create("a").add_child("b");
        assert_eq!(tree.get_or_create("a").children(), vec!["b"]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_add_child_creates_both() {
        let tree = SectionTree::new();
        tree.add_child("parent", "child");
        assert!(tree.contains("parent"));
        assert!(tree.contains("child"));
        assert_eq!(tree.names(), vec!["child", "parent"]);
    }

    #[test]
    fn test_resolve_includes_children() {
        let tree = SectionTree::new();
        let a = field_in(&tree, "a", "x");
        let b = field_in(&tree, "b", "y");
        tree.add_child("a", "b");

        let fields = tree.resolve("a", UnknownSectionPolicy::Warn).unwrap();
        assert_eq!(fields, vec![a, b.clone()]);
        assert_eq!(tree.resolve("b", UnknownSectionPolicy::Warn).unwrap(), vec![b]);
    }

    #[test]
    fn test_cycle_terminates() {
        let tree = SectionTree::new();
        let a = field_in(&tree, "a", "x");
        let b = field_in(&tree, "b", "y");
        tree.add_child("a", "b");
        tree.add_child("b", "a");
        tree.add_child("b", "b");

        let fields = tree.resolve("a", UnknownSectionPolicy::Warn).unwrap();
        assert_eq!(fields, vec![a, b]);
    }

    #[test]
    fn test_shared_child_counted_once() {
        let tree = SectionTree::new();
        let shared = field_in(&tree, "shared", "x");
        tree.add_child("root", "left");
        tree.add_child("root", "right");
        tree.add_child("left", "shared");
        tree.add_child("right", "shared");

        let fields = tree.resolve("root", UnknownSectionPolicy::Warn).unwrap();
        assert_eq!(fields, vec![shared]);
    }

    #[test]
    fn test_unknown_section_policy() {
        let tree = SectionTree::new();
        assert!(tree.resolve("ghost", UnknownSectionPolicy::Warn).unwrap().is_empty());
        assert_eq!(
            tree.resolve("ghost", UnknownSectionPolicy::Fail),
            Err(ValidationError::unknown_section("ghost"))
        );
    }

    #[test]
    fn test_inherited_rules_apply_to_own_fields_only() {
        let tree = SectionTree::new();
        let parent_field = field_in(&tree, "parent", Value::Null);
        let child_field = field_in(&tree, "child", Value::Null);
        tree.add_child("parent", "child");
        tree.add_inherited_rules("parent", &RuleSet::new().rule("required", true));

        let resolved = tree
            .resolve_inherited("parent", UnknownSectionPolicy::Warn)
            .unwrap();
        assert_eq!(resolved[0].field, parent_field);
        assert!(resolved[0].inherited.contains("required"));
        assert_eq!(resolved[1].field, child_field);
        assert!(resolved[1].inherited.is_empty());

        // Resolution leaves the fields' own rules alone.
        assert!(!parent_field.rules().contains("required"));
    }

    #[test]
    fn test_field_in_two_sections_inherits_from_both() {
        let tree = SectionTree::new();
        let field = field_in(&tree, "left", Value::Null);
        tree.get_or_create("right").add_field(&field);
        tree.add_child("root", "left");
        tree.add_child("root", "right");
        tree.add_inherited_rules("left", &RuleSet::new().rule("required", true));
        tree.add_inherited_rules("right", &RuleSet::new().rule("maxLength", 4));

        let resolved = tree.resolve_inherited("root", UnknownSectionPolicy::Warn).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].inherited.names(), vec!["required", "maxLength"]);

        let left_only = tree.resolve_inherited("left", UnknownSectionPolicy::Warn).unwrap();
        assert_eq!(left_only[0].inherited.names(), vec!["required"]);
    }

    #[test]
    fn test_gated_section_deactivates_and_contributes_nothing() {
        let tree = SectionTree::new();
        let field = field_in(&tree, "a", Value::Null);
        field.activate().unwrap();
        tree.set_conditional_validation("a", false);

        assert!(tree.resolve("a", UnknownSectionPolicy::Warn).unwrap().is_empty());
        assert!(!field.is_active());
    }

    #[test]
    fn test_observable_gate_deactivates_eagerly() {
        let tree = SectionTree::new();
        let field = field_in(&tree, "a", Value::Null);
        let gate = Observable::new(true);
        tree.set_conditional_validation("a", &gate);

        field.merge_rules(&RuleSet::new().rule("required", true));
        assert_eq!(field.activate(), Ok(false));
        assert!(field.has_error());

        gate.set(false);
        assert!(!field.is_active());
        assert!(!field.has_error());
    }
}
