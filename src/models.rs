use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

pub const FALLBACK_GLYPH: &str = "❔";
pub const DEFAULT_CATEGORY: &str = "idk";
pub const NEW_TASK_NAME: &str = "New thing";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(rename = "taskCreationTime")]
    pub id: Timestamp,
    #[serde(rename = "taskName")]
    pub name: String,
    #[serde(rename = "taskCategory")]
    pub category: String,
    #[serde(rename = "taskPriority")]
    pub priority: i64,
    #[serde(rename = "taskDueTime")]
    pub due_time: Option<Timestamp>,
    #[serde(rename = "taskCompletionTime")]
    pub completion_time: Option<Timestamp>,
    #[serde(rename = "taskNotes", default)]
    pub notes: String,
    #[serde(rename = "daysToResurrect", default)]
    pub days_to_resurrect: i64,
}

impl Task {
    pub fn new(id: Timestamp) -> Self {
        Self {
            id,
            name: NEW_TASK_NAME.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            priority: 0,
            due_time: None,
            completion_time: None,
            notes: String::new(),
            days_to_resurrect: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.completion_time.is_none()
    }

    pub fn is_pinned(&self) -> bool {
        self.priority > 0
    }
}

/// The whole persisted state. Category order is significant and survives a
/// parse/serialize cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    pub categories: IndexMap<String, String>,
    pub tasks: IndexMap<String, Task>,
}

impl Document {
    /// Starter document written by `--init` when no file exists yet.
    pub fn seed() -> Self {
        let mut categories = IndexMap::new();
        categories.insert(DEFAULT_CATEGORY.to_string(), FALLBACK_GLYPH.to_string());
        Self {
            last_modified: None,
            categories,
            tasks: IndexMap::new(),
        }
    }

    pub fn task_key(id: Timestamp) -> String {
        id.to_string()
    }

    pub fn task(&self, id: Timestamp) -> Option<&Task> {
        self.tasks.get(&Self::task_key(id))
    }

    pub fn task_mut(&mut self, id: Timestamp) -> Option<&mut Task> {
        self.tasks.get_mut(&Self::task_key(id))
    }

    pub fn insert_task(&mut self, task: Task) {
        self.tasks.insert(Self::task_key(task.id), task);
    }

    pub fn remove_task(&mut self, id: Timestamp) -> Option<Task> {
        self.tasks.shift_remove(&Self::task_key(id))
    }

    /// Zero-based position of `category` in the category order.
    pub fn category_position(&self, category: &str) -> Option<usize> {
        self.categories.get_index_of(category)
    }

    pub fn glyph(&self, category: &str) -> &str {
        self.categories
            .get(category)
            .map(String::as_str)
            .unwrap_or(FALLBACK_GLYPH)
    }
}
