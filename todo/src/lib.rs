//! A reactive todo list.
//!
//! The list lives in a [`TodoStore`], which supports three operations
//! (add, delete, toggle completion) and pushes the whole list to every
//! subscriber after each one. It builds on the reactive store crates:
//!
//! - State: [`TodoList`], an ordered, id-unique list of [`Todo`] items
//! - Actions: [`TodoAction`]
//! - Reducer: [`TodoReducer`], with a clock and id generator injected
//!   through [`TodoEnvironment`]
//!
//! # Quick Start
//!
//! ```
//! use todo::TodoStore;
//!
//! let store = TodoStore::default();
//!
//! // Called once now, then after every change
//! let subscription = store.subscribe(|todos| {
//!     println!("{} todos, {} done", todos.len(), todos.completed_count());
//! });
//!
//! let milk = store.add("buy milk");
//! let dog = store.add("walk dog");
//! store.complete_toggle(&milk);
//! store.delete(&dog);
//!
//! let todos = store.todos();
//! assert_eq!(todos.len(), 1);
//! assert!(todos.get(&milk).is_some_and(|t| t.completed));
//!
//! subscription.unsubscribe();
//! ```

pub mod reducer;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use reducer::{TodoEnvironment, TodoReducer};
pub use store::TodoStore;
pub use types::{Todo, TodoAction, TodoId, TodoList};
