//! # Reactive Store Runtime
//!
//! Runtime implementation for the reactive store.
//!
//! This crate provides the synchronous Store that coordinates reducer
//! execution, publishes state snapshots to observers and runs the
//! follow-up effects reducers return.
//!
//! ## Core Components
//!
//! - **Store**: owns the current state snapshot, the reducer and its environment
//! - **Subscription**: capability returned to every observer, removes it when dropped
//! - **`StoreConfig`**: notification policy for dispatches that change nothing
//!
//! ## Example
//!
//! ```ignore
//! use reactive_store_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Observe every snapshot (called once right away)
//! let subscription = store.subscribe(|state| render(&state));
//!
//! // Send an action; observers have run by the time this returns
//! store.send(Action::DoSomething);
//!
//! // Read state
//! let value = store.state(|s| s.some_field);
//! ```

use reactive_store_core::{effect::Effect, reducer::Reducer};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::ThreadId;

/// Metrics for store observability
pub mod metrics;

/// Observer registrations
pub mod subscription;

pub use subscription::{Subscription, SubscriptionId};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while configuring a Store
    ///
    /// Dispatching actions never fails; only configuration input can be
    /// rejected.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ConfigError {
        /// The notification policy name is not recognized
        #[error("Unknown notify policy '{0}' (expected 'always' or 'on_change')")]
        UnknownNotifyPolicy(String),
    }
}

pub use error::ConfigError;

/// Environment variable read by [`StoreConfig::from_env`]
pub const NOTIFY_POLICY_ENV: &str = "STORE_NOTIFY_POLICY";

/// When observers hear about a dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifyPolicy {
    /// Broadcast after every action, even when state is unchanged
    #[default]
    Always,
    /// Broadcast only when the reducer actually changed state
    OnChange,
}

impl NotifyPolicy {
    /// Configuration name of this policy
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::OnChange => "on_change",
        }
    }
}

impl std::fmt::Display for NotifyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Ok(Self::Always),
            "on_change" | "onchange" => Ok(Self::OnChange),
            _ => Err(ConfigError::UnknownNotifyPolicy(s.to_string())),
        }
    }
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use reactive_store_runtime::{NotifyPolicy, StoreConfig};
///
/// let config = StoreConfig::default().with_notify_policy(NotifyPolicy::OnChange);
/// assert_eq!(config.notify_policy, NotifyPolicy::OnChange);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Whether unchanged dispatches are broadcast
    pub notify_policy: NotifyPolicy,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(notify_policy: NotifyPolicy) -> Self {
        Self { notify_policy }
    }

    /// Set the notification policy
    #[must_use]
    pub const fn with_notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.notify_policy = policy;
        self
    }

    /// Load configuration from the process environment
    ///
    /// Reads [`NOTIFY_POLICY_ENV`]; an unset variable keeps the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownNotifyPolicy`] if the variable holds
    /// something other than `always` or `on_change`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownNotifyPolicy`] for an unrecognized policy.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(NOTIFY_POLICY_ENV) {
            config.notify_policy = value.parse()?;
        }
        Ok(config)
    }
}

/// Clears the dispatching thread even if a reducer or observer panics
struct OwnerGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        lock, Arc, Effect, Mutex, NotifyPolicy, OwnerGuard, Reducer, StoreConfig, ThreadId,
        VecDeque,
    };
    use crate::metrics::StoreMetrics;
    use crate::subscription::{Observer, Registry, Subscription, Unsubscribe};
    use std::time::Instant;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State, as an immutable `Arc<S>` snapshot replaced on every change
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Observers, invoked synchronously with each new snapshot
    ///
    /// Every dispatch runs the reducer on a fresh copy of the current
    /// snapshot. A snapshot handed to an observer is never mutated
    /// afterwards, so observers may keep it as long as they like.
    ///
    /// Actions sent by the dispatching thread itself (for example from
    /// inside an observer) are queued and applied, in arrival order, before
    /// the outermost `send` returns. A `send` from any other thread waits
    /// until the running dispatch has drained, then runs its own. Observers
    /// therefore always see snapshots in the order they were produced.
    ///
    /// An observer must not block on another thread that sends to the same
    /// store; that thread waits for the observer's dispatch to finish.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Mutex<Arc<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        observers: Arc<Mutex<Registry<S>>>,
        pending: Mutex<VecDeque<A>>,
        dispatch: Mutex<()>,
        owner: Mutex<Option<ThreadId>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
        S: Clone + PartialEq + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default`], which broadcasts after every action.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        ///
        /// # Example
        ///
        /// ```ignore
        /// let config = StoreConfig::default().with_notify_policy(NotifyPolicy::OnChange);
        /// let store = Store::with_config(MyState::default(), MyReducer, my_environment, config);
        /// ```
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            Self {
                state: Mutex::new(Arc::new(initial_state)),
                reducer,
                environment,
                config,
                observers: Arc::new(Mutex::new(Registry::new())),
                pending: Mutex::new(VecDeque::new()),
                dispatch: Mutex::new(()),
                owner: Mutex::new(None),
            }
        }

        /// The configuration this store was built with
        #[must_use]
        pub const fn config(&self) -> &StoreConfig {
            &self.config
        }

        /// The injected environment
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Send an action to the store
        ///
        /// Runs the reducer, publishes the resulting snapshot to every
        /// observer, then applies any actions fed back through
        /// [`Effect::Send`]. All of this completes before `send` returns,
        /// unless `send` is called re-entrantly from the dispatching thread,
        /// in which case the action is queued behind the dispatch already
        /// in progress. Calls from other threads block until that dispatch
        /// is over.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub fn send(&self, action: A) {
            let caller = std::thread::current().id();
            if *lock(&self.owner) == Some(caller) {
                tracing::trace!("Re-entrant send, action queued");
                lock(&self.pending).push_back(action);
                return;
            }

            let _dispatch = lock(&self.dispatch);
            *lock(&self.owner) = Some(caller);
            let _owner = OwnerGuard(&self.owner);

            lock(&self.pending).push_back(action);
            self.drain_pending();
        }

        fn drain_pending(&self) {
            loop {
                let next = lock(&self.pending).pop_front();
                let Some(action) = next else {
                    return;
                };
                self.dispatch(action);
            }
        }

        fn dispatch(&self, action: A) {
            tracing::debug!("Processing action");

            let (snapshot, changed, effects) = {
                let mut current = lock(&self.state);
                let mut next = S::clone(&**current);

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = Instant::now();
                let effects = self.reducer.reduce(&mut next, action, &self.environment);
                StoreMetrics::record_action(start.elapsed());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                let changed = next != **current;
                if changed {
                    *current = Arc::new(next);
                }
                (Arc::clone(&*current), changed, effects)
            };

            if changed || self.config.notify_policy == NotifyPolicy::Always {
                self.notify(&snapshot);
            } else {
                tracing::trace!("State unchanged, notification skipped");
                StoreMetrics::record_skipped_notification();
            }

            for effect in effects {
                self.enqueue_effect(effect);
            }
        }

        fn enqueue_effect(&self, effect: Effect<A>) {
            match effect {
                Effect::None => {}
                Effect::Send(action) => {
                    tracing::trace!("Effect::Send queued feedback action");
                    lock(&self.pending).push_back(*action);
                }
                Effect::Sequential(effects) => {
                    for effect in effects {
                        self.enqueue_effect(effect);
                    }
                }
            }
        }

        fn notify(&self, snapshot: &Arc<S>) {
            let observers = lock(&self.observers).snapshot();
            let mut delivered = 0;
            for (id, observer) in observers {
                // An earlier observer in this round may have removed this one.
                if !lock(&self.observers).contains(id) {
                    continue;
                }
                observer(Arc::clone(snapshot));
                delivered += 1;
            }
            tracing::trace!(observers = delivered, "Snapshot published");
            StoreMetrics::record_notification(delivered);
        }

        /// Register an observer
        ///
        /// The observer is called once immediately with the current
        /// snapshot, then with every snapshot published afterwards, until
        /// the returned [`Subscription`] is dropped or unsubscribed.
        ///
        /// # Example
        ///
        /// ```ignore
        /// let subscription = store.subscribe(|state| println!("{state:?}"));
        /// store.send(Action::Increment); // prints again
        /// subscription.unsubscribe();
        /// ```
        pub fn subscribe<F>(&self, observer: F) -> Subscription
        where
            F: Fn(Arc<S>) + Send + Sync + 'static,
        {
            let observer: Observer<S> = Arc::new(observer);
            let id = {
                let mut registry = lock(&self.observers);
                let id = registry.insert(Arc::clone(&observer));
                StoreMetrics::record_subscribers(registry.len());
                id
            };
            tracing::debug!(subscription = %id, "Observer subscribed");

            observer(self.snapshot());

            let registry: Arc<dyn Unsubscribe> = self.observers.clone();
            Subscription::new(id, Arc::downgrade(&registry))
        }

        /// Number of observers currently registered
        #[must_use]
        pub fn subscriber_count(&self) -> usize {
            lock(&self.observers).len()
        }

        /// The current state snapshot
        #[must_use]
        pub fn snapshot(&self) -> Arc<S> {
            Arc::clone(&*lock(&self.state))
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.items.len());
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let snapshot = self.snapshot();
            f(&snapshot)
        }
    }

    impl<S, A, E, R> std::fmt::Debug for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
        S: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("state", &*lock(&self.state))
                .field("config", &self.config)
                .field("subscribers", &lock(&self.observers).len())
                .finish_non_exhaustive()
        }
    }
}

pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use reactive_store_core::SmallVec;
    use reactive_store_testing::RecordingObserver;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct CounterState {
        count: i64,
    }

    #[derive(Clone, Debug)]
    enum CounterAction {
        Increment,
        Noop,
        /// Increment, then feed `n - 1` more increments back
        IncrementTimes(u32),
    }

    #[derive(Clone)]
    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut CounterState,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.count += 1;
                    SmallVec::new()
                }
                CounterAction::Noop => SmallVec::new(),
                CounterAction::IncrementTimes(0) => SmallVec::new(),
                CounterAction::IncrementTimes(n) => {
                    state.count += 1;
                    reactive_store_core::smallvec![Effect::send(CounterAction::IncrementTimes(
                        n - 1
                    ))]
                }
            }
        }
    }

    fn counter_store(config: StoreConfig) -> Store<CounterState, CounterAction, (), CounterReducer> {
        Store::with_config(CounterState::default(), CounterReducer, (), config)
    }

    #[test]
    fn send_updates_state() {
        let store = counter_store(StoreConfig::default());
        store.send(CounterAction::Increment);
        store.send(CounterAction::Increment);
        assert_eq!(store.state(|s| s.count), 2);
    }

    #[test]
    fn subscribe_delivers_current_state_immediately() {
        let store = counter_store(StoreConfig::default());
        store.send(CounterAction::Increment);

        let recorder = RecordingObserver::new();
        let _subscription = store.subscribe(recorder.observer());

        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.last().map(|s| s.count), Some(1));
    }

    #[test]
    fn always_policy_notifies_on_noop() {
        let store = counter_store(StoreConfig::default());
        let recorder = RecordingObserver::new();
        let _subscription = store.subscribe(recorder.observer());

        store.send(CounterAction::Noop);

        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn on_change_policy_skips_noop() {
        let store = counter_store(StoreConfig::new(NotifyPolicy::OnChange));
        let recorder = RecordingObserver::new();
        let _subscription = store.subscribe(recorder.observer());

        store.send(CounterAction::Noop);
        assert_eq!(recorder.len(), 1);

        store.send(CounterAction::Increment);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn unchanged_dispatch_keeps_snapshot_identity() {
        let store = counter_store(StoreConfig::default());
        let before = store.snapshot();
        store.send(CounterAction::Noop);
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn delivered_snapshots_are_never_mutated() {
        let store = counter_store(StoreConfig::default());
        let recorder = RecordingObserver::new();
        let _subscription = store.subscribe(recorder.observer());

        store.send(CounterAction::Increment);
        store.send(CounterAction::Increment);

        let counts: Vec<i64> = recorder.snapshots().iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![0, 1, 2]);
    }

    #[test]
    fn feedback_effects_run_before_send_returns() {
        let store = counter_store(StoreConfig::default());
        let recorder = RecordingObserver::new();
        let _subscription = store.subscribe(recorder.observer());

        store.send(CounterAction::IncrementTimes(3));

        assert_eq!(store.state(|s| s.count), 3);
        let counts: Vec<i64> = recorder.snapshots().iter().map(|s| s.count).collect();
        // initial, three increments, then the terminating IncrementTimes(0)
        assert_eq!(counts, vec![0, 1, 2, 3, 3]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let store = counter_store(StoreConfig::default());
        let recorder = RecordingObserver::new();
        let subscription = store.subscribe(recorder.observer());
        assert_eq!(store.subscriber_count(), 1);

        subscription.unsubscribe();
        store.send(CounterAction::Increment);

        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let store = counter_store(StoreConfig::default());
        let recorder = RecordingObserver::new();
        {
            let _subscription = store.subscribe(recorder.observer());
        }
        store.send(CounterAction::Increment);
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn dispatch_records_metrics() {
        let recorder = crate::metrics::tests::CountingRecorder::default();

        ::metrics::with_local_recorder(&recorder, || {
            let store = counter_store(StoreConfig::new(NotifyPolicy::OnChange));
            let first = RecordingObserver::new();
            let second = RecordingObserver::new();
            let _first = store.subscribe(first.observer());
            let _second = store.subscribe(second.observer());

            store.send(CounterAction::Increment);
            store.send(CounterAction::Noop);
        });

        assert_eq!(recorder.counter("store_actions_total"), 2);
        assert_eq!(recorder.counter("store_notifications_total"), 2);
        assert_eq!(recorder.counter("store_notifications_skipped_total"), 1);
        // Both subscriptions were dropped before the closure returned
        assert_eq!(recorder.gauge("store_subscribers"), Some(0.0));
    }

    #[test]
    fn config_from_lookup() {
        let config = StoreConfig::from_lookup(|_| Some("on-change".to_string()));
        assert_eq!(config, Ok(StoreConfig::new(NotifyPolicy::OnChange)));

        let config = StoreConfig::from_lookup(|_| None);
        assert_eq!(config, Ok(StoreConfig::default()));

        let config = StoreConfig::from_lookup(|_| Some("sometimes".to_string()));
        assert_eq!(
            config,
            Err(ConfigError::UnknownNotifyPolicy("sometimes".to_string()))
        );
    }

    #[test]
    fn notify_policy_round_trips_through_display() {
        for policy in [NotifyPolicy::Always, NotifyPolicy::OnChange] {
            assert_eq!(policy.to_string().parse::<NotifyPolicy>(), Ok(policy));
        }
    }
}
