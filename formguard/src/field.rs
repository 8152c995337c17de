//! Field validators: rules bound to one observable value.
//!
//! A field is created the first time an observable is bound and lives until
//! the engine is reset. Binding again merges rules into the existing set.
//!
//! # Lifecycle
//!
//! - **Inactive** (initial): no subscription, `error_state()` is `None` until
//!   the first activation.
//! - **Active**: subscribed to the observable; every value change re-runs the
//!   synchronous rules.
//! - `deactivate()` drops the subscription and clears the error state.
//!
//! Every activation, deactivation and observed value change bumps an epoch.
//! Async results only touch the field state if the epoch they were launched
//! under is still current.
//!
//! # Inherited rules
//!
//! Rules a field inherits from its sections are kept apart from its own
//! rules. Each activation supplies them (empty when the field is validated on
//! its own) and they stay in effect for live re-validation until the next
//! activation. Own rules come first and win on shared names.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::StreamExt;
use futures::future::{self, BoxFuture};
use futures::stream::FuturesUnordered;

use crate::error::{Result, ValidationError};
use crate::observable::{Observable, ObservableId, Subscription};
use crate::rules::{RuleParam, RuleRegistry, RuleSet};
use crate::sync::{lock, read, write};
use crate::value::Value;

/// Identity of a bound field: the identity of its observable.
pub type FieldId = ObservableId;

struct FieldInner {
    observable: Observable<Value>,
    registry: RuleRegistry,
    rules: RwLock<RuleSet>,
    inherited: RwLock<RuleSet>,
    sections: Mutex<Vec<String>>,
    has_error: Observable<Option<bool>>,
    error_message: Observable<String>,
    subscription: Mutex<Option<Subscription>>,
    epoch: AtomicU64,
}

/// A failing rule whose predicate faulted rather than returning a verdict.
struct Fault {
    message: String,
    error: ValidationError,
}

/// Rules bound to a single observable value.
///
/// Cloning yields another handle to the same field.
#[derive(Clone)]
pub struct FieldValidator {
    inner: Arc<FieldInner>,
}

impl FieldValidator {
    pub(crate) fn new(observable: Observable<Value>, registry: RuleRegistry) -> Self {
        Self {
            inner: Arc::new(FieldInner {
                observable,
                registry,
                rules: RwLock::new(RuleSet::new()),
                inherited: RwLock::new(RuleSet::new()),
                sections: Mutex::new(Vec::new()),
                has_error: Observable::new(None),
                error_message: Observable::new(String::new()),
                subscription: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Field identity.
    pub fn id(&self) -> FieldId {
        self.inner.observable.id()
    }

    /// The validated observable.
    pub fn observable(&self) -> &Observable<Value> {
        &self.inner.observable
    }

    /// Snapshot of the rules bound to this field.
    pub fn rules(&self) -> RuleSet {
        read(&self.inner.rules).clone()
    }

    /// Section rules supplied by the last activation.
    pub fn inherited_rules(&self) -> RuleSet {
        read(&self.inner.inherited).clone()
    }

    /// Sections this field was placed in directly.
    pub fn sections(&self) -> Vec<String> {
        lock(&self.inner.sections).clone()
    }

    /// Whether the last evaluation failed. `false` before the first one.
    pub fn has_error(&self) -> bool {
        self.inner.has_error.get().unwrap_or(false)
    }

    /// `None` until the field has been evaluated once.
    pub fn error_state(&self) -> Option<bool> {
        self.inner.has_error.get()
    }

    /// Message of the failing rule, empty when valid.
    pub fn error_message(&self) -> String {
        self.inner.error_message.get()
    }

    /// Observable error flag, for binding into a view.
    pub fn has_error_observable(&self) -> Observable<Option<bool>> {
        self.inner.has_error.clone()
    }

    /// Observable error message, for binding into a view.
    pub fn error_message_observable(&self) -> Observable<String> {
        self.inner.error_message.clone()
    }

    /// Whether value changes are currently re-validated.
    pub fn is_active(&self) -> bool {
        lock(&self.inner.subscription).is_some()
    }

    pub(crate) fn merge_rules(&self, rules: &RuleSet) {
        let mut current = write(&self.inner.rules);
        current.merge(rules);
        current.take_section();
    }

    pub(crate) fn add_section(&self, name: &str) {
        let mut sections = lock(&self.inner.sections);
        if !sections.iter().any(|s| s == name) {
            sections.push(name.to_string());
        }
    }

    /// Start live validation and evaluate the synchronous rules now.
    ///
    /// Returns whether the field is valid. A faulting rule marks the field in
    /// error and is returned as [`ValidationError::Rule`].
    pub fn activate(&self) -> Result<bool> {
        self.activate_with(&RuleSet::new())
    }

    /// [`activate`](Self::activate) with rules inherited from sections.
    pub fn activate_with(&self, inherited: &RuleSet) -> Result<bool> {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        *write(&self.inner.inherited) = inherited.clone();
        self.ensure_subscribed();
        let value = self.inner.observable.get();
        self.revalidate(&value)
    }

    /// Like [`activate`](Self::activate), then run every async rule
    /// concurrently.
    ///
    /// Synchronous rules are evaluated and async rules launched before this
    /// returns; the future resolves once every async rule has finished. The
    /// outcome is `false` if any rule, sync or async, failed.
    pub fn activate_async(&self) -> BoxFuture<'static, Result<bool>> {
        self.activate_async_with(&RuleSet::new())
    }

    /// [`activate_async`](Self::activate_async) with rules inherited from
    /// sections.
    pub fn activate_async_with(&self, inherited: &RuleSet) -> BoxFuture<'static, Result<bool>> {
        let sync_ok = match self.activate_with(inherited) {
            Ok(valid) => valid,
            Err(e) => return Box::pin(future::ready(Err(e))),
        };
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let value = self.inner.observable.get();

        let mut running = FuturesUnordered::new();
        for (name, param) in self.rule_list() {
            let Some(definition) = self.inner.registry.lookup(&name) else {
                continue;
            };
            let Some(pending) = definition.launch(param.get(), value.clone()) else {
                continue;
            };
            running.push(async move {
                let outcome = pending.await;
                (name, definition, param, outcome)
            });
        }

        let field = self.clone();
        Box::pin(async move {
            let mut failure: Option<String> = None;
            while let Some((name, definition, param, outcome)) = running.next().await {
                match outcome {
                    Ok(true) => {}
                    Ok(false) => failure = Some(definition.render_message(&param.get())),
                    Err(fault) => {
                        if field.is_current(epoch) {
                            field.set_state(true, definition.render_message(&param.get()));
                        }
                        return Err(ValidationError::rule(name, fault));
                    }
                }
            }

            if field.is_current(epoch) {
                match &failure {
                    Some(message) => field.set_state(true, message.clone()),
                    None if sync_ok => field.set_state(false, String::new()),
                    None => {}
                }
            } else {
                log::debug!("Discarding stale async result for field {}", field.id());
            }
            Ok(sync_ok && failure.is_none())
        })
    }

    /// Stop live validation and clear the error state. No-op when inactive.
    pub fn deactivate(&self) {
        let Some(subscription) = lock(&self.inner.subscription).take() else {
            return;
        };
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        drop(subscription);
        self.set_state(false, String::new());
        log::trace!("Field {} deactivated", self.id());
    }

    fn ensure_subscribed(&self) {
        let mut slot = lock(&self.inner.subscription);
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(self.inner.observable.subscribe(move |value| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let field = FieldValidator { inner };
            field.inner.epoch.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = field.revalidate(value) {
                log::error!("Field {} faulted on change: {}", field.id(), e);
            }
        }));
        log::trace!("Field {} activated", self.id());
    }

    fn revalidate(&self, value: &Value) -> Result<bool> {
        match self.check_sync(value) {
            Ok(None) => {
                self.set_state(false, String::new());
                Ok(true)
            }
            Ok(Some(message)) => {
                self.set_state(true, message);
                Ok(false)
            }
            Err(fault) => {
                self.set_state(true, fault.message);
                Err(fault.error)
            }
        }
    }

    /// Message of the first failing synchronous rule, in rule order.
    fn check_sync(&self, value: &Value) -> std::result::Result<Option<String>, Fault> {
        for (name, param) in self.rule_list() {
            let Some(definition) = self.inner.registry.lookup(&name) else {
                log::debug!("Skipping unknown rule '{}' on field {}", name, self.id());
                continue;
            };
            let param = param.get();
            match definition.check(&param, value) {
                None | Some(Ok(true)) => {}
                Some(Ok(false)) => return Ok(Some(definition.render_message(&param))),
                Some(Err(fault)) => {
                    return Err(Fault {
                        message: definition.render_message(&param),
                        error: ValidationError::rule(name, fault),
                    });
                }
            }
        }
        Ok(None)
    }

    /// Own rules in order, then inherited rules the field does not declare.
    fn rule_list(&self) -> Vec<(String, RuleParam)> {
        let own = read(&self.inner.rules);
        let inherited = read(&self.inner.inherited);
        own.iter()
            .chain(inherited.iter().filter(|(name, _)| !own.contains(name)))
            .map(|(name, param)| (name.to_string(), param.clone()))
            .collect()
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.epoch.load(Ordering::SeqCst) == epoch
    }

    fn set_state(&self, has_error: bool, message: String) {
        self.inner.error_message.set(message);
        self.inner.has_error.set(Some(has_error));
    }
}

impl PartialEq for FieldValidator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for FieldValidator {}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator")
            .field("id", &self.id())
            .field("rules", &read(&self.inner.rules).names())
            .field("active", &self.is_active())
            .field("has_error", &self.error_state())
            .finish()
    }
}
