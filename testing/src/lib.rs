//! # Reactive Store Testing
//!
//! Testing utilities and helpers for the reactive store.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits
//! - `ReducerTest`, a Given-When-Then harness for reducers
//! - `RecordingObserver`, which captures every snapshot a store publishes
//!
//! ## Example
//!
//! ```ignore
//! use reactive_store_testing::{test_clock, RecordingObserver, SequentialIdGenerator};
//! use reactive_store_runtime::Store;
//!
//! #[test]
//! fn records_every_snapshot() {
//!     let store = Store::new(State::default(), MyReducer, test_environment());
//!     let recorder = RecordingObserver::new();
//!     let _subscription = store.subscribe(recorder.observer());
//!
//!     store.send(Action::DoSomething);
//!
//!     assert_eq!(recorder.len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use reactive_store_core::environment::{Clock, IdGenerator};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;


pub use reducer_test::{assertions, ReducerTest};

/// Deterministic implementations of Environment traits
pub mod mocks {
    use super::{AtomicI64, AtomicU64, Clock, DateTime, IdGenerator, Ordering, Utc, Uuid};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use reactive_store_testing::mocks::FixedClock;
    /// use reactive_store_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Clock that advances by a fixed step on every reading
    ///
    /// Useful when ordering by creation time matters.
    #[derive(Debug)]
    pub struct SteppingClock {
        next_millis: AtomicI64,
        step_millis: i64,
    }

    impl SteppingClock {
        /// Start at `start`, advancing `step_millis` per call to `now`
        #[must_use]
        pub fn new(start: DateTime<Utc>, step_millis: i64) -> Self {
            Self {
                next_millis: AtomicI64::new(start.timestamp_millis()),
                step_millis,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let millis = self.next_millis.fetch_add(self.step_millis, Ordering::SeqCst);
            DateTime::from_timestamp_millis(millis).unwrap_or_default()
        }
    }

    /// Predictable ids: `00000000-0000-0000-0000-000000000001`, `...002`, ...
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        counter: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator whose first id ends in `1`
        #[must_use]
        pub const fn new() -> Self {
            Self {
                counter: AtomicU64::new(0),
            }
        }

        /// The id the `n`th call (1-based) returns
        #[must_use]
        pub const fn nth(n: u64) -> Uuid {
            Uuid::from_u128(n as u128)
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> Uuid {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            Self::nth(n)
        }
    }
}

/// Observer that records every snapshot it receives
///
/// Clones share the same recording, so keep one handle for assertions and
/// pass [`RecordingObserver::observer`] to the store.
#[derive(Debug)]
pub struct RecordingObserver<S> {
    snapshots: Arc<Mutex<Vec<Arc<S>>>>,
}

impl<S> RecordingObserver<S> {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Callback suitable for `Store::subscribe`
    #[must_use]
    pub fn observer(&self) -> impl Fn(Arc<S>) + Send + Sync + 'static + use<S>
    where
        S: Send + Sync + 'static,
    {
        let snapshots = Arc::clone(&self.snapshots);
        move |snapshot| {
            snapshots
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(snapshot);
        }
    }

    /// Every snapshot received so far, oldest first
    #[must_use]
    pub fn snapshots(&self) -> Vec<Arc<S>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent snapshot
    #[must_use]
    pub fn last(&self) -> Option<Arc<S>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of notifications received
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if nothing has been received yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Clone for RecordingObserver<S> {
    fn clone(&self) -> Self {
        Self {
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}

impl<S> Default for RecordingObserver<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a `tracing` subscriber for tests
///
/// Honors `RUST_LOG`, writes through the test harness so output is only
/// shown for failing tests, and is safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, SequentialIdGenerator, SteppingClock};
