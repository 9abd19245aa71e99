//! Observer registry and the `Subscription` capability handed back by
//! `Store::subscribe`.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Callback invoked with every published state snapshot
pub(crate) type Observer<S> = Arc<dyn Fn(Arc<S>) + Send + Sync>;

/// Identifier of one registration with a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the raw numeric id
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Registered observers, kept in registration order
pub(crate) struct Registry<S> {
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer<S>)>,
}

impl<S> Registry<S> {
    pub(crate) const fn new() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, observer: Observer<S>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.observers.iter().any(|(existing, _)| *existing == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Clones the current observer list so callbacks can run unlocked
    pub(crate) fn snapshot(&self) -> Vec<(SubscriptionId, Observer<S>)> {
        self.observers
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect()
    }
}

/// Type-erased removal so `Subscription` does not carry the state type
pub(crate) trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<S: 'static> Unsubscribe for Mutex<Registry<S>> {
    fn unsubscribe(&self, id: SubscriptionId) {
        let mut registry = self.lock().unwrap_or_else(PoisonError::into_inner);
        if registry.remove(id) {
            crate::metrics::StoreMetrics::record_subscribers(registry.len());
            tracing::debug!(subscription = %id, "Observer unsubscribed");
        }
    }
}

/// Capability to stop receiving state updates
///
/// Returned by `Store::subscribe`. The observer stays registered until
/// [`Subscription::unsubscribe`] is called or the handle is dropped.
/// Outliving the store is harmless: removal becomes a no-op.
#[must_use = "dropping a Subscription unsubscribes its observer"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, registry: Weak<dyn Unsubscribe>) -> Self {
        Self { id, registry }
    }

    /// The id this registration was given
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the observer
    ///
    /// Notification rounds that start after this returns skip it. A round
    /// already running on another thread may still call it once.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("store_alive", &(self.registry.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Observer<u8> {
        Arc::new(|_| {})
    }

    #[test]
    fn registry_assigns_increasing_ids() {
        let mut registry = Registry::new();
        let first = registry.insert(noop());
        let second = registry.insert(noop());
        assert!(first < second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_remove_is_idempotent() {
        let mut registry = Registry::new();
        let id = registry.insert(noop());
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(!registry.contains(id));
    }

    #[test]
    fn dropping_subscription_removes_observer() {
        let registry = Arc::new(Mutex::new(Registry::<u8>::new()));
        let id = registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(noop());
        let erased: Arc<dyn Unsubscribe> = registry.clone();
        let subscription = Subscription::new(id, Arc::downgrade(&erased));
        drop(erased);

        subscription.unsubscribe();

        let registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let registry = Arc::new(Mutex::new(Registry::<u8>::new()));
        let id = registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(noop());
        let erased: Arc<dyn Unsubscribe> = registry;
        let subscription = Subscription::new(id, Arc::downgrade(&erased));
        drop(erased);

        assert_eq!(subscription.id(), id);
        drop(subscription);
    }

    #[test]
    fn subscription_id_display() {
        assert_eq!(SubscriptionId(7).to_string(), "sub-7");
    }
}
