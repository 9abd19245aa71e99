//! `TodoStore`: the todo list behind a reactive store.

use crate::reducer::{TodoEnvironment, TodoReducer};
use crate::types::{TodoAction, TodoId, TodoList};
use reactive_store_runtime::{Store, StoreConfig, Subscription};
use std::sync::Arc;

/// Owns one todo list and broadcasts every change to its subscribers
///
/// Each instance starts empty and lives as long as its owner; there is no
/// process-wide list. Every operation returns only after all subscribers
/// have been called with the resulting list.
pub struct TodoStore {
    store: Store<TodoList, TodoAction, TodoEnvironment, TodoReducer>,
}

impl TodoStore {
    /// Creates an empty store that notifies after every operation
    #[must_use]
    pub fn new(environment: TodoEnvironment) -> Self {
        Self::with_config(environment, StoreConfig::default())
    }

    /// Creates an empty store with an explicit notification policy
    #[must_use]
    pub fn with_config(environment: TodoEnvironment, config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(TodoList::new(), TodoReducer::new(), environment, config),
        }
    }

    /// Registers `observer`; it is called now with the current list, then
    /// after every operation until the subscription is dropped
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Arc<TodoList>) + Send + Sync + 'static,
    {
        self.store.subscribe(observer)
    }

    /// Appends a new open todo and returns its id
    pub fn add(&self, text: impl Into<String>) -> TodoId {
        let id = TodoId::from_uuid(self.store.environment().ids.next_id());
        self.store.send(TodoAction::Add {
            id,
            text: text.into(),
        });
        id
    }

    /// Removes the todo with `id`, if there is one
    pub fn delete(&self, id: &TodoId) {
        self.store.send(TodoAction::Delete { id: *id });
    }

    /// Flips the completed flag of the todo with `id`, if there is one
    pub fn complete_toggle(&self, id: &TodoId) {
        self.store.send(TodoAction::ToggleComplete { id: *id });
    }

    /// The current list
    #[must_use]
    pub fn todos(&self) -> Arc<TodoList> {
        self.store.snapshot()
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.store.subscriber_count()
    }

    /// The notification policy in effect
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        self.store.config()
    }
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new(TodoEnvironment::production())
    }
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactive_store_testing::{test_clock, RecordingObserver, SequentialIdGenerator};

    fn test_store() -> TodoStore {
        TodoStore::new(TodoEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new()),
        ))
    }

    #[test]
    fn add_returns_generated_id() {
        let store = test_store();

        let id = store.add("buy milk");

        assert_eq!(*id.as_uuid(), SequentialIdGenerator::nth(1));
        assert!(store.todos().contains(&id));
    }

    #[test]
    fn every_operation_notifies() {
        let store = test_store();
        let recorder = RecordingObserver::new();
        let _subscription = store.subscribe(recorder.observer());

        let id = store.add("a");
        store.complete_toggle(&id);
        store.delete(&id);

        let lens: Vec<usize> = recorder.snapshots().iter().map(|l| l.len()).collect();
        assert_eq!(lens, vec![0, 1, 1, 0]);
    }

    #[test]
    fn default_store_uses_random_ids() {
        let store = TodoStore::default();
        let first = store.add("a");
        let second = store.add("b");
        assert_ne!(first, second);
    }
}
