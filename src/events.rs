use crate::models::{Settings, TaskMap, TaskStateMap};

pub const EVENT_STATE_UPDATED: &str = "state_updated";

/// Full-state snapshot handed to the presentation layer after every
/// persisted mutation; it re-renders from this rather than diffing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatePayload {
    pub tasks: TaskMap,
    pub task_states: TaskStateMap,
    pub settings: Settings,
}
