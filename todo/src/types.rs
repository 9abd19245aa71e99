//! Domain types for the todo list.
//!
//! A todo list is an ordered collection of todo items that can be added,
//! toggled and deleted. Order is insertion order; removing an item keeps
//! the relative order of the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a todo item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(Uuid);

impl TodoId {
    /// Creates a `TodoId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single todo item
///
/// Only `completed` ever changes after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier
    pub id: TodoId,
    /// User-supplied content, stored as given
    pub text: String,
    /// Whether the todo is completed
    pub completed: bool,
    /// Creation time in milliseconds since the Unix epoch
    pub created_at: i64,
}

impl Todo {
    /// Creates a new, not yet completed, todo item
    #[must_use]
    pub const fn new(id: TodoId, text: String, created_at: i64) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at,
        }
    }

    /// Creation time as a calendar timestamp
    ///
    /// `None` only if `created_at` is outside the range `chrono` supports.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// The ordered, id-unique list of todos held by a `TodoStore`
///
/// Serializes as a plain JSON array. Deserializing keeps only the first
/// todo for each id, the same as collecting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Todo>", into = "Vec<Todo>")]
pub struct TodoList {
    todos: Vec<Todo>,
}

impl TodoList {
    /// Creates a new empty list
    #[must_use]
    pub const fn new() -> Self {
        Self { todos: Vec::new() }
    }

    /// Returns the number of todos
    #[must_use]
    pub fn len(&self) -> usize {
        self.todos.len()
    }

    /// True if the list holds no todos
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Todos in list order
    pub fn iter(&self) -> std::slice::Iter<'_, Todo> {
        self.todos.iter()
    }

    /// Todos in list order, as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Todo] {
        &self.todos
    }

    /// Index of the first todo with `id`
    #[must_use]
    pub fn position(&self, id: &TodoId) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == *id)
    }

    /// Returns a todo by ID
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&Todo> {
        self.position(id).map(|index| &self.todos[index])
    }

    /// Checks if a todo exists
    #[must_use]
    pub fn contains(&self, id: &TodoId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the number of completed todos
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|todo| todo.completed).count()
    }

    /// Returns the number of todos still open
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.len() - self.completed_count()
    }

    /// Appends a todo; the caller guarantees its id is not already present
    pub(crate) fn push(&mut self, todo: Todo) {
        self.todos.push(todo);
    }

    /// Removes the todo with `id`, keeping the order of the rest
    pub(crate) fn remove(&mut self, id: &TodoId) -> Option<Todo> {
        self.position(id).map(|index| self.todos.remove(index))
    }

    /// Flips `completed` on the todo with `id`; false if there is none
    pub(crate) fn toggle(&mut self, id: &TodoId) -> bool {
        match self.todos.iter_mut().find(|todo| todo.id == *id) {
            Some(todo) => {
                todo.completed = !todo.completed;
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a TodoList {
    type Item = &'a Todo;
    type IntoIter = std::slice::Iter<'a, Todo>;

    fn into_iter(self) -> Self::IntoIter {
        self.todos.iter()
    }
}

impl FromIterator<Todo> for TodoList {
    /// Collects todos, keeping only the first occurrence of each id
    fn from_iter<I: IntoIterator<Item = Todo>>(iter: I) -> Self {
        let mut list = Self::new();
        for todo in iter {
            if !list.contains(&todo.id) {
                list.push(todo);
            }
        }
        list
    }
}

impl From<Vec<Todo>> for TodoList {
    fn from(todos: Vec<Todo>) -> Self {
        todos.into_iter().collect()
    }
}

impl From<TodoList> for Vec<Todo> {
    fn from(list: TodoList) -> Self {
        list.todos
    }
}

/// Actions accepted by the todo reducer
///
/// Every action is total: one naming an id that is not in the list leaves
/// the list unchanged rather than failing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TodoAction {
    /// Append a new todo
    Add {
        /// Identifier for the new todo, fresh from the id generator
        id: TodoId,
        /// Content of the todo
        text: String,
    },

    /// Remove a todo
    Delete {
        /// Todo to delete
        id: TodoId,
    },

    /// Flip a todo between open and completed
    ToggleComplete {
        /// Todo to toggle
        id: TodoId,
    },
}
