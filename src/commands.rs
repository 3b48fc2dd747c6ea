use std::path::{Path, PathBuf};

use chrono::Local;

use crate::events::StatePayload;
use crate::models::{self, Settings, TaskMap};
use crate::state::{AppState, CategoryRemoval};
use crate::storage::{self, Storage, StorageError};

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Environment the command layer runs in: where the data files live and
/// how the presentation layer is told to re-render. Tests substitute a
/// temp-dir context.
pub trait CommandCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError>;
    fn emit_state_updated(&self, payload: StatePayload);
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

/// Files a mutation writes. Each operation persists only what it touched;
/// a refused or no-op command writes nothing at all.
#[derive(Debug, Clone, Copy, Default)]
struct PersistScope {
    tasks: bool,
    task_states: bool,
    settings: bool,
}

impl PersistScope {
    const TASKS: Self = Self {
        tasks: true,
        task_states: false,
        settings: false,
    };
    const TASK_STATES: Self = Self {
        tasks: false,
        task_states: true,
        settings: false,
    };
    const SETTINGS: Self = Self {
        tasks: false,
        task_states: false,
        settings: true,
    };

    fn with(self, other: Self) -> Self {
        Self {
            tasks: self.tasks || other.tasks,
            task_states: self.task_states || other.task_states,
            settings: self.settings || other.settings,
        }
    }
}

fn snapshot(state: &AppState) -> StatePayload {
    StatePayload {
        tasks: state.tasks(),
        task_states: state.task_states(),
        settings: state.settings(),
    }
}

fn persist(
    ctx: &impl CommandCtx,
    state: &AppState,
    scope: PersistScope,
) -> Result<(), StorageError> {
    let storage = Storage::new(ctx.data_dir()?);
    storage.ensure_dirs()?;
    if scope.tasks {
        storage.save_tasks(&state.tasks())?;
    }
    if scope.task_states {
        storage.save_task_states(&state.task_states())?;
    }
    if scope.settings {
        storage.save_settings(&state.settings())?;
    }
    ctx.emit_state_updated(snapshot(state));
    Ok(())
}

/// Reloads all three files, substituting built-in defaults for anything
/// missing or unreadable, and refreshes the shared state.
pub fn load_state(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<StatePayload> {
    let root = match ctx.data_dir() {
        Ok(path) => path,
        Err(e) => return err(&format!("data dir error: {e}")),
    };
    let storage = Storage::new(root);
    if let Err(error) = storage.ensure_dirs() {
        return err(&format!("storage error: {error:?}"));
    }
    let tasks = crate::load_or_default(storage.load_tasks(), "tasks", models::default_tasks);
    let task_states =
        crate::load_or_default(storage.load_task_states(), "task states", Default::default);
    let settings =
        crate::load_or_default(storage.load_settings(), "settings", Settings::default);
    state.replace_all(tasks, task_states, settings);
    ok(snapshot(state))
}

pub fn add_task(
    ctx: &impl CommandCtx,
    state: &AppState,
    category: &str,
    text: &str,
) -> CommandResult<bool> {
    if !state.add_task(category, text) {
        return ok(false);
    }
    if let Err(error) = persist(ctx, state, PersistScope::TASKS) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

pub fn remove_task(
    ctx: &impl CommandCtx,
    state: &AppState,
    category: &str,
    text: &str,
) -> CommandResult<bool> {
    if !state.remove_task(category, text) {
        return ok(false);
    }
    let scope = PersistScope::TASKS.with(PersistScope::TASK_STATES);
    if let Err(error) = persist(ctx, state, scope) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

pub fn toggle_completion(
    ctx: &impl CommandCtx,
    state: &AppState,
    category: &str,
    text: &str,
) -> CommandResult<bool> {
    let today = Local::now().date_naive();
    if !state.toggle_completion(category, text, today) {
        return ok(false);
    }
    if let Err(error) = persist(ctx, state, PersistScope::TASK_STATES) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

pub fn add_category(ctx: &impl CommandCtx, state: &AppState, name: &str) -> CommandResult<bool> {
    if !state.add_category(name) {
        return ok(false);
    }
    let scope = PersistScope::TASKS.with(PersistScope::SETTINGS);
    if let Err(error) = persist(ctx, state, scope) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

pub fn remove_category(ctx: &impl CommandCtx, state: &AppState, name: &str) -> CommandResult<bool> {
    match state.remove_category(name) {
        CategoryRemoval::Reserved => err(&format!("the {} category cannot be deleted", models::DAILIES)),
        CategoryRemoval::Missing => ok(false),
        CategoryRemoval::Removed => {
            let scope = PersistScope::TASKS
                .with(PersistScope::TASK_STATES)
                .with(PersistScope::SETTINGS);
            if let Err(error) = persist(ctx, state, scope) {
                return err(&format!("storage error: {error:?}"));
            }
            ok(true)
        }
    }
}

pub fn move_category(
    ctx: &impl CommandCtx,
    state: &AppState,
    name: &str,
    index: usize,
) -> CommandResult<bool> {
    if !state.move_category(name, index) {
        return ok(false);
    }
    if let Err(error) = persist(ctx, state, PersistScope::SETTINGS) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

/// Clears every completion record ("Reset All Tasks").
pub fn clear_all_completions(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<bool> {
    if !state.clear_all_completions() {
        return ok(false);
    }
    if let Err(error) = persist(ctx, state, PersistScope::TASK_STATES) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

/// Parses the raw reset-time input. Hour and minute arrive as user text;
/// non-numeric or out-of-range values are reported without mutating
/// anything.
pub fn set_reset_time(
    ctx: &impl CommandCtx,
    state: &AppState,
    hour: &str,
    minute: &str,
) -> CommandResult<Settings> {
    let (Ok(hour), Ok(minute)) = (hour.trim().parse::<u32>(), minute.trim().parse::<u32>())
    else {
        return err("enter valid numbers for hour and minute");
    };
    if hour > 23 || minute > 59 {
        return err("hours must be 0-23 and minutes 0-59");
    }

    let previous = state.settings();
    let mut next = previous.clone();
    next.reset_hour = hour;
    next.reset_minute = minute;
    update_settings(ctx, state, previous, next)
}

pub fn toggle_theme(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<Settings> {
    let previous = state.settings();
    let mut next = previous.clone();
    next.theme = previous.theme.toggled();
    update_settings(ctx, state, previous, next)
}

pub fn set_custom_color(
    ctx: &impl CommandCtx,
    state: &AppState,
    color: &str,
) -> CommandResult<Settings> {
    if !is_hex_color(color) {
        return err("colors must look like #rrggbb");
    }
    let previous = state.settings();
    let mut next = previous.clone();
    next.custom_color = color.to_string();
    update_settings(ctx, state, previous, next)
}

pub fn set_window_size(
    ctx: &impl CommandCtx,
    state: &AppState,
    width: u32,
    height: u32,
) -> CommandResult<Settings> {
    let previous = state.settings();
    let mut next = previous.clone();
    next.window_width = width;
    next.window_height = height;
    update_settings(ctx, state, previous, next)
}

// Settings writes share a rollback path: if persisting fails, the
// in-memory value is restored so the running app stays consistent with
// what the user last saw on disk.
fn update_settings(
    ctx: &impl CommandCtx,
    state: &AppState,
    previous: Settings,
    next: Settings,
) -> CommandResult<Settings> {
    state.update_settings(next.clone());
    if let Err(error) = persist(ctx, state, PersistScope::SETTINGS) {
        state.update_settings(previous);
        return err(&format!("storage error: {error:?}"));
    }
    ok(next)
}

/// Replaces the task store wholesale from a user-chosen JSON file. An
/// unreadable or invalid file aborts the import with the existing state
/// untouched.
pub fn import_tasks(ctx: &impl CommandCtx, state: &AppState, path: &Path) -> CommandResult<bool> {
    let tasks: TaskMap = match storage::load_json_file(path) {
        Ok(tasks) => tasks,
        Err(error) => return err(&format!("failed to import file: {error}")),
    };
    let settings_changed = state.replace_tasks(tasks);
    let mut scope = PersistScope::TASKS;
    if settings_changed {
        scope = scope.with(PersistScope::SETTINGS);
    }
    if let Err(error) = persist(ctx, state, scope) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

/// Replaces settings wholesale from a user-chosen JSON file. Keys missing
/// from the import are back-filled with built-in defaults.
pub fn import_settings(
    ctx: &impl CommandCtx,
    state: &AppState,
    path: &Path,
) -> CommandResult<Settings> {
    let imported: Settings = match storage::load_json_file(path) {
        Ok(settings) => settings,
        Err(error) => return err(&format!("failed to import file: {error}")),
    };
    let previous = state.settings();
    state.replace_settings(imported);
    if let Err(error) = persist(ctx, state, PersistScope::SETTINGS) {
        state.update_settings(previous);
        return err(&format!("storage error: {error:?}"));
    }
    ok(state.settings())
}

fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
