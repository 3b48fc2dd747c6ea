use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::reset::ResetMarkers;
use crate::state::{AppState, ResetChanges};
use crate::storage::Storage;

/// Polling granularity. Must stay under a minute so the configured reset
/// minute can never be skipped entirely.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns the background reset loop. It polls until the shutdown channel
/// flips to `true` or its sender is dropped; either ends the loop at the
/// next poll boundary, so a test harness or graceful shutdown can stop it
/// deterministically.
pub fn start_scheduler(
    state: AppState,
    data_dir: PathBuf,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let markers = ResetMarkers::capture(Local::now().naive_local());
    tokio::spawn(run(state, data_dir, POLL_INTERVAL, markers, shutdown))
}

async fn run(
    state: AppState,
    data_dir: PathBuf,
    poll: Duration,
    mut markers: ResetMarkers,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    log::info!("reset scheduler started, polling every {}s", poll.as_secs());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Local::now().naive_local();
                let changes = state.apply_due_resets(now, &mut markers);
                if changes.any() {
                    persist_changes(&state, &data_dir, changes);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    log::info!("reset scheduler stopped");
}

// A failed write here is logged and left alone; the store still holds the
// reset state and the next successful persist carries it to disk.
fn persist_changes(state: &AppState, data_dir: &Path, changes: ResetChanges) {
    let storage = Storage::new(data_dir.to_path_buf());
    if let Err(error) = storage.ensure_dirs() {
        log::warn!("reset persist skipped, data dir unavailable: {error}");
        return;
    }
    if changes.tasks {
        if let Err(error) = storage.save_tasks(&state.tasks()) {
            log::warn!("failed to persist tasks after reset: {error}");
        }
    }
    if changes.task_states {
        if let Err(error) = storage.save_task_states(&state.task_states()) {
            log::warn!("failed to persist task states after reset: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{self, Settings, TaskStateMap, DAILIES};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn default_state() -> AppState {
        AppState::new(
            models::default_tasks(),
            TaskStateMap::new(),
            Settings::default(),
        )
    }

    #[tokio::test]
    async fn scheduler_stops_when_signalled() {
        let dir = tempfile::tempdir().unwrap();
        let state = default_state();
        let markers = ResetMarkers::capture(Local::now().naive_local());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run(
            state,
            dir.path().to_path_buf(),
            Duration::from_millis(5),
            markers,
            rx,
        ));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn scheduler_stops_when_the_sender_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let state = default_state();
        let markers = ResetMarkers::capture(Local::now().naive_local());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run(
            state,
            dir.path().to_path_buf(),
            Duration::from_millis(5),
            markers,
            rx,
        ));

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn overdue_boundaries_are_applied_and_persisted_on_the_first_poll() {
        let dir = tempfile::tempdir().unwrap();
        let state = default_state();
        state.add_category("Workout Weekly");
        state.add_task("Workout Weekly", "Run");
        state.toggle_completion(
            "Workout Weekly",
            "Run",
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        );

        // Markers frozen in the past: the current week and month both
        // differ, so the first poll clears the weekly category.
        let markers = ResetMarkers::capture(at(2024, 1, 5, 12, 0));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            state.clone(),
            dir.path().to_path_buf(),
            Duration::from_millis(5),
            markers,
            rx,
        ));

        // Poll until the reset lands, then stop the loop.
        for _ in 0..100 {
            if state.task_states().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();

        assert!(state.task_states().is_empty());
        let persisted = std::fs::read_to_string(dir.path().join("task_states.json")).unwrap();
        assert_eq!(persisted.trim(), "{}");
    }

    #[tokio::test]
    async fn quiet_polls_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = default_state();
        state.toggle_completion(
            DAILIES,
            "Physical Win",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );

        // Markers captured now: no boundary can be due during the test.
        let markers = ResetMarkers::capture(Local::now().naive_local());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            state.clone(),
            dir.path().to_path_buf(),
            Duration::from_millis(5),
            markers,
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();

        assert_eq!(state.task_states().len(), 1);
        assert!(!dir.path().join("task_states.json").exists());
        assert!(!dir.path().join("tasks.json").exists());
    }
}
