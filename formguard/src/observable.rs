//! Observable values with change subscription.
//!
//! `Observable<T>` is the reactive collaborator the engine binds rules to. It
//! is a cheap-to-clone handle (`Arc<Mutex<..>>`) so field validators, section
//! gates and application view models can all hold the same value.
//!
//! Subscribers are stored as `Weak` callbacks. Dropping the [`Subscription`]
//! returned by [`Observable::subscribe`] detaches the callback; dead entries
//! are pruned on the next notification.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type WeakCallback<T> = Weak<dyn Fn(&T) + Send + Sync>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an observable, shared by all of its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(u64);

impl ObservableId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Inner<T> {
    value: T,
    version: u64,
    subscribers: Vec<WeakCallback<T>>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Cloning creates another handle to the same value. Setting a value equal to
/// the current one is a no-op: no version bump and no notifications.
///
/// # Example
///
/// ```
/// use formguard::Observable;
///
/// let name = Observable::new(String::new());
/// let _sub = name.subscribe(|v| println!("name is now {v}"));
/// name.set("Ada".to_string());
/// assert_eq!(name.version(), 1);
/// ```
pub struct Observable<T> {
    id: ObservableId,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f.debug_struct("Observable")
            .field("id", &self.id)
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + 'static> Observable<T> {
    /// Create a new observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            id: ObservableId::next(),
            inner: Arc::new(Mutex::new(Inner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Identity shared by every clone of this observable.
    pub fn id(&self) -> ObservableId {
        self.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Access the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.lock();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Modify the value in place, notifying subscribers if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut inner = self.lock();
            let before = inner.value.clone();
            f(&mut inner.value);
            if inner.value != before {
                inner.version += 1;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Subscribe to changes. The callback runs after every value change until
    /// the returned [`Subscription`] is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let strong: Callback<T> = Arc::new(callback);
        self.lock().subscribers.push(Arc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of mutations that changed the value.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Registered subscribers, including dropped ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self) {
        // Callbacks run without the lock held so they may read or set other
        // observables, including this one.
        let (callbacks, value) = {
            let mut inner = self.lock();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks: Vec<Callback<T>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (callbacks, inner.value.clone())
        };
        for callback in &callbacks {
            callback(&value);
        }
    }
}

/// Handle keeping a subscriber callback alive. Drop it to unsubscribe.
pub struct Subscription {
    _guard: Box<dyn Any + Send + Sync>,
}

impl Subscription {
    /// Unsubscribe explicitly. Equivalent to dropping the handle.
    pub fn dispose(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Either a literal value or an observable one.
///
/// [`MaybeObservable::get`] unwraps both the same way, so rule parameters and
/// section gates can be static or dynamic without the engine caring which.
#[derive(Clone)]
pub enum MaybeObservable<T> {
    /// A fixed value.
    Value(T),
    /// A value read from an observable at evaluation time.
    Observable(Observable<T>),
}

impl<T: Clone + PartialEq + Send + 'static> MaybeObservable<T> {
    /// Current value, whichever variant this is.
    pub fn get(&self) -> T {
        match self {
            Self::Value(v) => v.clone(),
            Self::Observable(o) => o.get(),
        }
    }

    /// Whether the value can change over time.
    pub fn is_observable(&self) -> bool {
        matches!(self, Self::Observable(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for MaybeObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Observable(o) => f.debug_tuple("Observable").field(o).finish(),
        }
    }
}

impl<T> From<Observable<T>> for MaybeObservable<T> {
    fn from(o: Observable<T>) -> Self {
        Self::Observable(o)
    }
}

impl<T> From<&Observable<T>> for MaybeObservable<T> {
    fn from(o: &Observable<T>) -> Self {
        Self::Observable(o.clone())
    }
}

impl From<bool> for MaybeObservable<bool> {
    fn from(v: bool) -> Self {
        Self::Value(v)
    }
}

impl Default for MaybeObservable<bool> {
    fn default() -> Self {
        Self::Value(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_bumps_version_only_on_change() {
        let obs = Observable::new(1);
        obs.set(1);
        assert_eq!(obs.version(), 0);
        obs.set(2);
        assert_eq!(obs.version(), 1);
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn test_clones_share_identity_and_value() {
        let a = Observable::new(String::from("x"));
        let b = a.clone();
        b.set("y".to_string());
        assert_eq!(a.get(), "y");
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), Observable::new(String::new()).id());
    }

    #[test]
    fn test_dropping_subscription_stops_notifications() {
        let obs = Observable::new(0);
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sub = obs.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        obs.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sub.dispose();
        obs.set(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_may_read_the_observable() {
        let obs = Observable::new(0);
        let reader = obs.clone();
        let last = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&last);
        let _sub = obs.subscribe(move |_| sink.store(reader.get(), Ordering::SeqCst));
        obs.set(7);
        assert_eq!(last.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_update_in_place() {
        let obs = Observable::new(vec![1, 2]);
        obs.update(|v| v.push(3));
        assert_eq!(obs.get(), vec![1, 2, 3]);
        obs.update(|_| {});
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn test_maybe_observable_unwraps_both() {
        let fixed: MaybeObservable<bool> = false.into();
        assert!(!fixed.get());
        assert!(!fixed.is_observable());

        let flag = Observable::new(false);
        let dynamic = MaybeObservable::from(&flag);
        flag.set(true);
        assert!(dynamic.get());
    }
}
