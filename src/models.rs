use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reserved category. It cannot be deleted and the scheduler rewrites its
/// task list back to [`DEFAULT_DAILY_TASKS`] on every daily reset.
pub const DAILIES: &str = "Dailies";

pub const DEFAULT_DAILY_TASKS: [&str; 3] = ["Physical Win", "Mental Win", "Spiritual Win"];

/// Category name -> ordered task texts, as persisted in `tasks.json`.
pub type TaskMap = BTreeMap<String, Vec<String>>;

/// `"<category>:<task>"` -> completion record, as persisted in `task_states.json`.
pub type TaskStateMap = BTreeMap<String, CompletionRecord>;

pub fn default_daily_list() -> Vec<String> {
    DEFAULT_DAILY_TASKS.iter().map(|t| t.to_string()).collect()
}

pub fn default_tasks() -> TaskMap {
    let mut tasks = TaskMap::new();
    tasks.insert(DAILIES.to_string(), default_daily_list());
    tasks
}

/// Key of a task's completion record. Task texts are unique within a
/// category, so the pair identifies the record.
pub fn state_key(category: &str, text: &str) -> String {
    format!("{category}:{text}")
}

/// Prefix shared by every completion record of one category.
pub fn state_key_prefix(category: &str) -> String {
    format!("{category}:")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Completion state of a single task. Un-completing keeps the old
/// `date_completed` around; only a fresh completion re-stamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionRecord {
    pub completed: bool,
    #[serde(default)]
    pub date_completed: Option<NaiveDate>,
}

impl CompletionRecord {
    pub fn completed_on(date: NaiveDate) -> Self {
        Self {
            completed: true,
            date_completed: Some(date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_custom_color")]
    pub custom_color: String,
    #[serde(default)]
    pub reset_hour: u32,
    #[serde(default)]
    pub reset_minute: u32,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_tab_order")]
    pub tab_order: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            custom_color: default_custom_color(),
            reset_hour: 0,
            reset_minute: 0,
            window_width: default_window_width(),
            window_height: default_window_height(),
            tab_order: default_tab_order(),
        }
    }
}

fn default_custom_color() -> String {
    "#ffffff".to_string()
}

fn default_window_width() -> u32 {
    600
}

fn default_window_height() -> u32 {
    400
}

fn default_tab_order() -> Vec<String> {
    vec![DAILIES.to_string()]
}
