//! Reducer logic for the todo list.
//!
//! Input text is never validated here; emptiness or length rules belong to
//! whatever UI sits in front of the store.

use crate::types::{Todo, TodoAction, TodoList};
use reactive_store_core::{
    effect::Effect,
    environment::{Clock, IdGenerator, SystemClock, UuidGenerator},
    reducer::Reducer,
    SmallVec,
};
use std::sync::Arc;

/// Environment dependencies for the todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Clock for creation timestamps
    pub clock: Arc<dyn Clock>,
    /// Source of fresh todo ids
    pub ids: Arc<dyn IdGenerator>,
}

impl TodoEnvironment {
    /// Creates a new `TodoEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { clock, ids }
    }

    /// System clock and random v4 ids
    #[must_use]
    pub fn production() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(UuidGenerator))
    }
}

impl std::fmt::Debug for TodoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoEnvironment").finish_non_exhaustive()
    }
}

/// Reducer for the todo list
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for TodoReducer {
    type State = TodoList;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TodoAction::Add { id, text } => {
                // Keeps ids unique even if a caller reuses one.
                if state.contains(&id) {
                    tracing::warn!(%id, "Ignoring add with an id already in the list");
                } else {
                    let created_at = env.clock.now().timestamp_millis();
                    state.push(Todo::new(id, text, created_at));
                    tracing::debug!(%id, len = state.len(), "Todo added");
                }
            }

            TodoAction::Delete { id } => {
                if state.remove(&id).is_some() {
                    tracing::debug!(%id, len = state.len(), "Todo deleted");
                } else {
                    tracing::debug!(%id, "Delete of unknown todo, list unchanged");
                }
            }

            TodoAction::ToggleComplete { id } => {
                if state.toggle(&id) {
                    tracing::debug!(%id, "Todo completion toggled");
                } else {
                    tracing::debug!(%id, "Toggle of unknown todo, list unchanged");
                }
            }
        }

        SmallVec::new()
    }
}
