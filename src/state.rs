use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{
    self, CompletionRecord, Settings, TaskMap, TaskStateMap, DAILIES,
};
use crate::reset::{self, ResetMarkers};

/// Outcome of [`AppState::remove_category`]. Deleting the reserved
/// category must surface a user-facing refusal, never a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRemoval {
    Removed,
    Missing,
    Reserved,
}

/// Which persisted files a scheduled reset pass touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResetChanges {
    pub tasks: bool,
    pub task_states: bool,
}

impl ResetChanges {
    pub fn any(self) -> bool {
        self.tasks || self.task_states
    }
}

/// Shared task store. The command layer and the reset scheduler both hold
/// clones; every operation runs under the single inner mutex so a user
/// edit and a scheduled reset can never interleave.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

#[derive(Debug)]
struct AppData {
    tasks: TaskMap,
    task_states: TaskStateMap,
    settings: Settings,
}

impl AppState {
    pub fn new(tasks: TaskMap, task_states: TaskStateMap, mut settings: Settings) -> Self {
        reconcile_tab_order(&tasks, &mut settings.tab_order);
        Self {
            inner: Arc::new(Mutex::new(AppData {
                tasks,
                task_states,
                settings,
            })),
        }
    }

    pub fn tasks(&self) -> TaskMap {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.clone()
    }

    pub fn task_states(&self) -> TaskStateMap {
        let guard = self.inner.lock().expect("state poisoned");
        guard.task_states.clone()
    }

    pub fn settings(&self) -> Settings {
        let guard = self.inner.lock().expect("state poisoned");
        guard.settings.clone()
    }

    /// Appends a task to a category. No-op (returns false) on empty text
    /// after trimming, an unknown category, or a duplicate text.
    pub fn add_task(&self, category: &str, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let mut guard = self.inner.lock().expect("state poisoned");
        let Some(list) = guard.tasks.get_mut(category) else {
            return false;
        };
        if list.iter().any(|t| t == text) {
            return false;
        }
        list.push(text.to_string());
        true
    }

    /// Removes a task and its completion record, if present.
    pub fn remove_task(&self, category: &str, text: &str) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        let data = &mut *guard;
        let Some(list) = data.tasks.get_mut(category) else {
            return false;
        };
        let Some(position) = list.iter().position(|t| t == text) else {
            return false;
        };
        list.remove(position);
        data.task_states.remove(&models::state_key(category, text));
        true
    }

    /// Flips a task's completion record. Completing stamps `today`;
    /// un-completing flips the flag and keeps the stale stamp. Records are
    /// never created for a text that is not currently in the category's
    /// list, so toggling cannot produce orphaned state.
    pub fn toggle_completion(&self, category: &str, text: &str, today: NaiveDate) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        let data = &mut *guard;
        let in_list = data
            .tasks
            .get(category)
            .is_some_and(|list| list.iter().any(|t| t == text));
        if !in_list {
            return false;
        }
        let key = models::state_key(category, text);
        match data.task_states.get_mut(&key) {
            Some(record) if record.completed => record.completed = false,
            _ => {
                data.task_states
                    .insert(key, CompletionRecord::completed_on(today));
            }
        }
        true
    }

    /// Creates an empty category and appends it to the tab order. No-op on
    /// an empty or already-taken name.
    pub fn add_category(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let mut guard = self.inner.lock().expect("state poisoned");
        if guard.tasks.contains_key(name) {
            return false;
        }
        guard.tasks.insert(name.to_string(), Vec::new());
        guard.settings.tab_order.push(name.to_string());
        true
    }

    /// Deletes a category, its completion records, and its tab-order entry.
    /// The reserved category is refused outright.
    pub fn remove_category(&self, name: &str) -> CategoryRemoval {
        if name == DAILIES {
            return CategoryRemoval::Reserved;
        }
        let mut guard = self.inner.lock().expect("state poisoned");
        let data = &mut *guard;
        if data.tasks.remove(name).is_none() {
            return CategoryRemoval::Missing;
        }
        clear_prefix(&mut data.task_states, name);
        data.settings.tab_order.retain(|n| n != name);
        CategoryRemoval::Removed
    }

    /// Moves a category to `index` in the tab order (clamped to the end).
    /// Returns whether the order actually changed.
    pub fn move_category(&self, name: &str, index: usize) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        let order = &mut guard.settings.tab_order;
        let Some(position) = order.iter().position(|n| n == name) else {
            return false;
        };
        let entry = order.remove(position);
        let target = index.min(order.len());
        order.insert(target, entry);
        target != position
    }

    /// Rewrites a category's list back to the built-in daily defaults and
    /// drops all of its completion records. Only meaningful for the
    /// reserved category; a missing category is left alone.
    pub fn reset_category_to_default(&self, name: &str) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        let data = &mut *guard;
        if !data.tasks.contains_key(name) {
            return false;
        }
        reset_to_default(data, name);
        true
    }

    /// Drops every completion record of one category, list untouched.
    pub fn clear_completions(&self, name: &str) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        clear_prefix(&mut guard.task_states, name)
    }

    /// Drops every completion record across all categories.
    pub fn clear_all_completions(&self) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        if guard.task_states.is_empty() {
            return false;
        }
        guard.task_states.clear();
        true
    }

    /// Replaces the whole task map (import) and re-reconciles the tab
    /// order against the new categories. Returns whether settings changed.
    pub fn replace_tasks(&self, tasks: TaskMap) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        let data = &mut *guard;
        data.tasks = tasks;
        let before = data.settings.tab_order.clone();
        reconcile_tab_order(&data.tasks, &mut data.settings.tab_order);
        before != data.settings.tab_order
    }

    /// Replaces settings verbatim (reset time, theme, dimensions...).
    pub fn update_settings(&self, settings: Settings) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.settings = settings;
    }

    /// Replaces settings from an import, reconciling the imported tab
    /// order against the categories that actually exist.
    pub fn replace_settings(&self, mut settings: Settings) {
        let mut guard = self.inner.lock().expect("state poisoned");
        reconcile_tab_order(&guard.tasks, &mut settings.tab_order);
        guard.settings = settings;
    }

    /// Replaces everything at once (reload from disk).
    pub fn replace_all(&self, tasks: TaskMap, task_states: TaskStateMap, mut settings: Settings) {
        let mut guard = self.inner.lock().expect("state poisoned");
        reconcile_tab_order(&tasks, &mut settings.tab_order);
        guard.tasks = tasks;
        guard.task_states = task_states;
        guard.settings = settings;
    }

    /// One scheduler poll, executed under a single lock acquisition so a
    /// concurrent user edit can never observe a half-applied reset.
    ///
    /// Daily: at the configured minute on a new calendar day, the reserved
    /// category is rewritten to its default list and every other category
    /// whose name ends in "daily" has its completions cleared. Weekly and
    /// monthly clear completions for the matching suffixes on ISO-week and
    /// (year, month) changes. Markers advance whenever their boundary is
    /// crossed, whether or not any category matched.
    pub fn apply_due_resets(&self, now: NaiveDateTime, markers: &mut ResetMarkers) -> ResetChanges {
        let mut guard = self.inner.lock().expect("state poisoned");
        let data = &mut *guard;
        let mut changes = ResetChanges::default();

        if reset::daily_reset_due(markers, now, &data.settings) {
            if data.tasks.contains_key(DAILIES) {
                reset_to_default(data, DAILIES);
                changes.tasks = true;
                changes.task_states = true;
                log::info!("daily reset: restored default {DAILIES} list");
            }
            for name in cadence_matches(&data.tasks, reset::DAILY_SUFFIX) {
                if clear_prefix(&mut data.task_states, &name) {
                    changes.task_states = true;
                    log::info!("daily reset: cleared completions for {name}");
                }
            }
            markers.mark_daily(now);
        }

        if reset::weekly_reset_due(markers, now) {
            for name in cadence_matches(&data.tasks, reset::WEEKLY_SUFFIX) {
                if clear_prefix(&mut data.task_states, &name) {
                    changes.task_states = true;
                    log::info!("weekly reset: cleared completions for {name}");
                }
            }
            markers.mark_weekly(now);
        }

        if reset::monthly_reset_due(markers, now) {
            for name in cadence_matches(&data.tasks, reset::MONTHLY_SUFFIX) {
                if clear_prefix(&mut data.task_states, &name) {
                    changes.task_states = true;
                    log::info!("monthly reset: cleared completions for {name}");
                }
            }
            markers.mark_monthly(now);
        }

        changes
    }
}

fn reset_to_default(data: &mut AppData, name: &str) {
    if let Some(list) = data.tasks.get_mut(name) {
        *list = models::default_daily_list();
    }
    clear_prefix(&mut data.task_states, name);
}

fn clear_prefix(task_states: &mut TaskStateMap, category: &str) -> bool {
    let prefix = models::state_key_prefix(category);
    let before = task_states.len();
    task_states.retain(|key, _| !key.starts_with(&prefix));
    task_states.len() != before
}

fn cadence_matches(tasks: &TaskMap, suffix: &str) -> Vec<String> {
    tasks
        .keys()
        .filter(|name| name.as_str() != DAILIES && reset::has_cadence_suffix(name, suffix))
        .cloned()
        .collect()
}

/// Every category appears in the tab order exactly once and every entry
/// names an existing category; stale entries are dropped, missing
/// categories appended.
fn reconcile_tab_order(tasks: &TaskMap, tab_order: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    tab_order.retain(|name| tasks.contains_key(name) && seen.insert(name.clone()));
    for name in tasks.keys() {
        if !seen.contains(name) {
            tab_order.push(name.clone());
        }
    }
}
