use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::Document;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable at {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt data in {path}: {source}")]
    CorruptData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn unavailable(path: &Path, source: std::io::Error) -> Self {
        StoreError::StorageUnavailable {
            path: path.to_path_buf(),
            source,
        }
    }

    fn corrupt(path: &Path, source: serde_json::Error) -> Self {
        StoreError::CorruptData {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::StorageUnavailable { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// File-backed holder of the single task document.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<Document, StoreError> {
        load_json(&self.path)
    }

    /// Overwrites the document in full. Readers see either the old or the new
    /// file, never a partial write.
    pub fn replace(&self, document: &Document) -> Result<(), StoreError> {
        write_atomic(&self.path, document)
    }

    /// Writes `document` only when no document exists yet. Returns whether a
    /// file was created.
    pub fn init_if_missing(&self, document: &Document) -> Result<bool, StoreError> {
        if self.exists() {
            return Ok(false);
        }
        self.replace(document)?;
        Ok(true)
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let mut file = File::open(path).map_err(|err| StoreError::unavailable(path, err))?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)
        .map_err(|err| StoreError::unavailable(path, err))?;
    serde_json::from_str(&buf).map_err(|err| StoreError::corrupt(path, err))
}

pub(crate) fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(data).map_err(|err| StoreError::corrupt(path, err))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|err| StoreError::unavailable(path, err))?;

    // Unique temp name per writer so concurrent replaces never share a file.
    let mut temp =
        tempfile::NamedTempFile::new_in(&dir).map_err(|err| StoreError::unavailable(path, err))?;
    temp.write_all(&json)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|err| StoreError::unavailable(path, err))?;
    temp.persist(path)
        .map_err(|err| StoreError::unavailable(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Task};

    fn store_in(dir: &tempfile::TempDir) -> TaskStore {
        TaskStore::new(dir.path().join("taskList.json"))
    }

    #[test]
    fn replace_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut doc = Document::seed();
        doc.last_modified = Some(1234);
        doc.categories.insert("work".to_string(), "💼".to_string());
        let mut task = Task::new(1000);
        task.due_time = Some(5000);
        task.priority = 2;
        task.notes = "line one\nline two".to_string();
        doc.insert_task(task);
        let mut done = Task::new(2000);
        done.completion_time = Some(3000);
        doc.insert_task(done);

        store.replace(&doc).unwrap();
        assert_eq!(store.load().unwrap(), doc);
    }

    #[test]
    fn seed_document_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let json = r#"{"categories":{"idk":"❔"},"tasks":{}}"#;
        let doc: Document = serde_json::from_str(json).unwrap();

        store.replace(&doc).unwrap();
        let back = store.load().unwrap();
        assert!(back.tasks.is_empty());
        assert_eq!(back.categories.len(), 1);
        assert_eq!(back.categories.get("idk").map(String::as_str), Some("❔"));
    }

    #[test]
    fn document_without_last_modified_is_written_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let json = r#"{
          "categories": { "work": "💼", "idk": "❔" },
          "tasks": {
            "7": {
              "taskCreationTime": 7,
              "taskName": "x",
              "taskCategory": "work",
              "taskPriority": 0,
              "taskDueTime": null,
              "taskCompletionTime": null,
              "taskNotes": "",
              "daysToResurrect": 0
            }
          }
        }"#;
        let original: serde_json::Value = serde_json::from_str(json).unwrap();
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.last_modified, None);

        store.replace(&doc).unwrap();
        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, original);
        assert!(on_disk.get("lastModified").is_none());

        let reloaded = serde_json::to_value(store.load().unwrap()).unwrap();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn load_missing_file_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let err = store.load().expect_err("missing file should fail");
        assert!(matches!(err, StoreError::StorageUnavailable { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn load_malformed_file_is_corrupt_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::CorruptData { .. })));

        fs::write(store.path(), r#"{"categories": 3, "tasks": {}}"#).unwrap();
        let err = store.load().expect_err("wrong shape should fail");
        assert!(matches!(err, StoreError::CorruptData { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn replace_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut doc = Document::seed();
        doc.insert_task(Task::new(1));
        store.replace(&doc).unwrap();

        let replacement = Document::seed();
        store.replace(&replacement).unwrap();
        assert_eq!(store.load().unwrap(), replacement);

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name(), "taskList.json");
    }

    #[test]
    fn replace_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("nested").join("taskList.json"));
        store.replace(&Document::seed()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn init_if_missing_only_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.init_if_missing(&Document::seed()).unwrap());

        let mut doc = Document::seed();
        doc.insert_task(Task::new(9));
        store.replace(&doc).unwrap();
        assert!(!store.init_if_missing(&Document::seed()).unwrap());
        assert_eq!(store.load().unwrap(), doc);
    }
}
