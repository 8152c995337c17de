//! Validator definitions: a predicate plus an error message template.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::error::RuleFault;
use crate::value::Value;

/// Placeholder replaced by the rule parameter in message templates.
pub const PARAM_PLACEHOLDER: &str = "{param}";

/// Verdict of a single rule: pass, fail, or a fault.
pub type RuleOutcome = Result<bool, RuleFault>;

type SyncPredicate = Arc<dyn Fn(&Value, &Value) -> RuleOutcome + Send + Sync>;
type AsyncPredicate = Arc<dyn Fn(Value, Value) -> BoxFuture<'static, RuleOutcome> + Send + Sync>;

/// How a rule computes its verdict.
#[derive(Clone)]
pub enum Predicate {
    /// Evaluated inline, never suspends.
    Sync(SyncPredicate),
    /// Evaluated as a future; only run by async validation.
    Async(AsyncPredicate),
}

/// A named rule's behaviour: predicate `(param, value)` plus message template.
///
/// # Example
///
/// ```
/// use formguard::rules::ValidatorDefinition;
/// use formguard::Value;
///
/// let even = ValidatorDefinition::new(
///     |_param, value| value.as_number().is_none_or(|n| n % 2.0 == 0.0),
///     "Please enter an even number",
/// );
/// assert!(!even.is_async());
/// ```
#[derive(Clone)]
pub struct ValidatorDefinition {
    predicate: Predicate,
    message: String,
}

impl ValidatorDefinition {
    /// Synchronous rule that always produces a verdict.
    pub fn new<F>(predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Self::fallible(move |param, value| Ok(predicate(param, value)), message)
    }

    /// Synchronous rule that may fault.
    pub fn fallible<F>(predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value, &Value) -> RuleOutcome + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Sync(Arc::new(predicate)),
            message: message.into(),
        }
    }

    /// Asynchronous rule returning a future.
    pub fn new_async<F, Fut>(predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuleOutcome> + Send + 'static,
    {
        Self {
            predicate: Predicate::Async(Arc::new(move |param, value| {
                Box::pin(predicate(param, value))
            })),
            message: message.into(),
        }
    }

    /// Asynchronous rule in callback style: the predicate receives a
    /// [`Completion`] and settles it whenever its result is known.
    ///
    /// The predicate is invoked as soon as the rule is launched. A completion
    /// dropped without being settled faults with [`RuleFault::Abandoned`].
    pub fn with_callback<F>(predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(Value, Value, Completion) + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Async(Arc::new(move |param, value| {
                let (tx, rx) = oneshot::channel();
                predicate(param, value, Completion { tx });
                Box::pin(async move { rx.await.unwrap_or(Err(RuleFault::Abandoned)) })
            })),
            message: message.into(),
        }
    }

    /// Whether this rule only runs during async validation.
    pub fn is_async(&self) -> bool {
        matches!(self.predicate, Predicate::Async(_))
    }

    /// The predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The raw message template.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message with `{param}` replaced by `param`.
    pub fn render_message(&self, param: &Value) -> String {
        if self.message.contains(PARAM_PLACEHOLDER) {
            self.message.replace(PARAM_PLACEHOLDER, &param.to_string())
        } else {
            self.message.clone()
        }
    }

    /// Evaluate a synchronous rule. Returns `None` for async rules.
    pub fn check(&self, param: &Value, value: &Value) -> Option<RuleOutcome> {
        match &self.predicate {
            Predicate::Sync(f) => Some(f(param, value)),
            Predicate::Async(_) => None,
        }
    }

    /// Launch an asynchronous rule. Returns `None` for sync rules.
    pub fn launch(&self, param: Value, value: Value) -> Option<BoxFuture<'static, RuleOutcome>> {
        match &self.predicate {
            Predicate::Sync(_) => None,
            Predicate::Async(f) => Some(f(param, value)),
        }
    }
}

impl fmt::Debug for ValidatorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorDefinition")
            .field("async", &self.is_async())
            .field("message", &self.message)
            .finish()
    }
}

/// Settles a callback-style async rule.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<RuleOutcome>,
}

impl Completion {
    /// Report the verdict.
    pub fn resolve(self, valid: bool) {
        self.settle(Ok(valid));
    }

    /// Report that the rule could not be evaluated.
    pub fn fail(self, reason: impl Into<String>) {
        self.settle(Err(RuleFault::failed(reason)));
    }

    /// Report an arbitrary outcome.
    pub fn settle(self, outcome: RuleOutcome) {
        // The receiver is gone once validation stopped waiting; nothing to do.
        let _ = self.tx.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_render_message_substitutes_param() {
        let def = ValidatorDefinition::new(|_, _| true, "At most {param} characters");
        assert_eq!(def.render_message(&Value::from(5)), "At most 5 characters");

        let plain = ValidatorDefinition::new(|_, _| true, "Required");
        assert_eq!(plain.render_message(&Value::from(true)), "Required");
    }

    #[test]
    fn test_sync_definition_checks_inline() {
        let def = ValidatorDefinition::new(|p, v| p == v, "mismatch");
        assert_eq!(def.check(&Value::from("a"), &Value::from("a")), Some(Ok(true)));
        assert!(def.launch(Value::Null, Value::Null).is_none());
    }

    #[test]
    fn test_callback_definition_resolves() {
        let def = ValidatorDefinition::with_callback(
            |_, value, done| done.resolve(value == Value::from("ok")),
            "not ok",
        );
        assert!(def.is_async());
        assert!(def.check(&Value::Null, &Value::Null).is_none());

        let fut = def.launch(Value::Null, Value::from("ok")).unwrap();
        assert_eq!(block_on(fut), Ok(true));
    }

    #[test]
    fn test_dropped_completion_is_a_fault() {
        let def = ValidatorDefinition::with_callback(|_, _, done| drop(done), "never");
        let fut = def.launch(Value::Null, Value::Null).unwrap();
        assert_eq!(block_on(fut), Err(RuleFault::Abandoned));
    }

    #[test]
    fn test_completion_failure_carries_reason() {
        let def = ValidatorDefinition::with_callback(|_, _, done| done.fail("backend down"), "x");
        let fut = def.launch(Value::Null, Value::Null).unwrap();
        assert_eq!(block_on(fut), Err(RuleFault::failed("backend down")));
    }
}
