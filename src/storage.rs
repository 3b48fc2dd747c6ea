use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Settings, TaskMap, TaskStateMap};

const TASKS_FILE: &str = "tasks.json";
const TASK_STATES_FILE: &str = "task_states.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Reads a user-chosen JSON file (imports). Not rooted at the data dir.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let mut file = File::open(path)?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn load_tasks(&self) -> Result<TaskMap, StorageError> {
        self.load_json(self.root.join(TASKS_FILE))
    }

    pub fn load_task_states(&self) -> Result<TaskStateMap, StorageError> {
        self.load_json(self.root.join(TASK_STATES_FILE))
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        self.load_json(self.root.join(SETTINGS_FILE))
    }

    pub fn save_tasks(&self, data: &TaskMap) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(TASKS_FILE), data)
    }

    pub fn save_task_states(&self, data: &TaskStateMap) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(TASK_STATES_FILE), data)
    }

    pub fn save_settings(&self, data: &Settings) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(SETTINGS_FILE), data)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = to_pretty_json(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

// The data files have always been written with 4-space indentation; keep
// them byte-compatible and easy to hand-edit.
fn to_pretty_json<T: Serialize>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{self, CompletionRecord, Theme, DAILIES};
    use chrono::NaiveDate;

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.ensure_dirs().unwrap();
        (dir, storage)
    }

    #[test]
    fn tasks_round_trip_preserves_list_order() {
        let (_dir, storage) = storage();
        let mut tasks = models::default_tasks();
        tasks.insert(
            "Workout Weekly".to_string(),
            vec!["Run".to_string(), "Lift".to_string(), "Bike".to_string()],
        );

        storage.save_tasks(&tasks).unwrap();
        let loaded = storage.load_tasks().unwrap();
        assert_eq!(loaded, tasks);
        assert_eq!(
            loaded.get("Workout Weekly").cloned().unwrap(),
            vec!["Run".to_string(), "Lift".to_string(), "Bike".to_string()]
        );
    }

    #[test]
    fn task_states_and_settings_round_trip() {
        let (_dir, storage) = storage();

        let mut states = TaskStateMap::new();
        states.insert(
            models::state_key(DAILIES, "Physical Win"),
            CompletionRecord::completed_on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
        );
        states.insert(
            models::state_key("Workout Weekly", "Run"),
            CompletionRecord {
                completed: false,
                date_completed: Some(NaiveDate::from_ymd_opt(2024, 4, 28).unwrap()),
            },
        );
        storage.save_task_states(&states).unwrap();
        assert_eq!(storage.load_task_states().unwrap(), states);

        let mut settings = Settings::default();
        settings.theme = Theme::Dark;
        settings.reset_hour = 5;
        settings.tab_order = vec!["Workout Weekly".to_string(), DAILIES.to_string()];
        storage.save_settings(&settings).unwrap();
        let loaded = storage.load_settings().unwrap();
        assert_eq!(loaded, settings);
        // tab_order round-trips in order.
        assert_eq!(loaded.tab_order[0], "Workout Weekly");
    }

    #[test]
    fn files_are_written_with_four_space_indentation() {
        let (dir, storage) = storage();
        storage.save_tasks(&models::default_tasks()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("tasks.json")).unwrap();
        assert!(text.contains("\n    \"Dailies\": [\n        \"Physical Win\","));
    }

    #[test]
    fn writes_go_through_a_temp_file() {
        let (dir, storage) = storage();
        storage.save_settings(&Settings::default()).unwrap();
        assert!(dir.path().join("settings.json").is_file());
        assert!(!dir.path().join("settings.tmp").exists());
    }

    #[test]
    fn missing_and_corrupt_files_are_errors() {
        let (dir, storage) = storage();
        assert!(matches!(storage.load_tasks(), Err(StorageError::Io(_))));

        std::fs::write(dir.path().join("tasks.json"), b"{ not json").unwrap();
        assert!(matches!(storage.load_tasks(), Err(StorageError::Json(_))));
        // The error formats mention their source.
        let err = storage.load_tasks().unwrap_err();
        assert!(err.to_string().starts_with("json error:"));
    }

    #[test]
    fn load_json_file_reads_external_imports() {
        let (dir, _storage) = storage();
        let path = dir.path().join("import.json");
        std::fs::write(&path, br#"{ "Reading Monthly": ["Chapter"] }"#).unwrap();

        let tasks: TaskMap = load_json_file(&path).unwrap();
        assert_eq!(
            tasks.get("Reading Monthly").cloned().unwrap(),
            vec!["Chapter".to_string()]
        );

        let missing: Result<TaskMap, _> = load_json_file(&dir.path().join("nope.json"));
        assert!(missing.is_err());
    }
}
