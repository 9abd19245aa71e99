//! Demo for the todo store.
//!
//! Subscribes a printer that writes every list snapshot as JSON, then runs
//! through add, toggle and delete.

use reactive_store_runtime::StoreConfig;
use std::sync::Arc;
use todo::{TodoEnvironment, TodoList, TodoStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_snapshot(todos: &Arc<TodoList>) {
    match serde_json::to_string(todos.as_ref()) {
        Ok(json) => println!("{json}"),
        Err(error) => tracing::error!(%error, "Failed to serialize todo list"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo=debug,reactive_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    reactive_store_runtime::metrics::register_metrics();

    let config = StoreConfig::from_env()?;
    tracing::info!(notify_policy = %config.notify_policy, "Starting todo demo");

    let store = TodoStore::with_config(TodoEnvironment::production(), config);
    let subscription = store.subscribe(|todos| print_snapshot(&todos));

    let milk = store.add("buy milk");
    let dog = store.add("walk dog");
    store.complete_toggle(&milk);
    store.delete(&dog);

    // No such todo any more: unchanged list, broadcast only under `always`
    store.delete(&dog);

    subscription.unsubscribe();

    let todos = store.todos();
    tracing::info!(
        total = todos.len(),
        completed = todos.completed_count(),
        "Demo complete"
    );
    Ok(())
}
