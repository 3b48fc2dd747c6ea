//! Habit tracker core: named categories of tasks, per-task completion
//! records, JSON persistence, and a background loop that resets completion
//! state on daily/weekly/monthly boundaries. The presentation layer sits
//! on top of [`commands`] and renders from the snapshots it emits.

pub mod commands;
pub mod events;
pub mod logging;
pub mod models;
pub mod reset;
pub mod scheduler;
pub mod state;
pub mod storage;

use std::path::PathBuf;

use crate::models::{Settings, TaskStateMap};
use crate::state::AppState;
use crate::storage::{Storage, StorageError};

/// Loads the shared state from the data directory. Missing files are
/// normal (first launch); unreadable ones are logged and replaced with
/// built-in defaults. Nothing here is fatal except an unusable data dir.
pub fn bootstrap(data_dir: PathBuf) -> Result<AppState, StorageError> {
    let storage = Storage::new(data_dir);
    storage.ensure_dirs()?;
    let tasks = load_or_default(storage.load_tasks(), "tasks", models::default_tasks);
    let task_states =
        load_or_default(storage.load_task_states(), "task states", TaskStateMap::new);
    let settings = load_or_default(storage.load_settings(), "settings", Settings::default);
    Ok(AppState::new(tasks, task_states, settings))
}

pub(crate) fn load_or_default<T>(
    loaded: Result<T, StorageError>,
    what: &str,
    default: impl FnOnce() -> T,
) -> T {
    match loaded {
        Ok(value) => value,
        Err(StorageError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => default(),
        Err(error) => {
            log::warn!("{what} unreadable, falling back to defaults: {error}");
            default()
        }
    }
}
