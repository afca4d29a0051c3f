use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Document, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortType {
    OldestFirst,
    NewestFirst,
    #[default]
    DueSoonest,
    ByCategory,
}

impl SortType {
    pub const ALL: [SortType; 4] = [
        SortType::OldestFirst,
        SortType::NewestFirst,
        SortType::DueSoonest,
        SortType::ByCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::OldestFirst => "oldestFirst",
            SortType::NewestFirst => "newestFirst",
            SortType::DueSoonest => "dueSoonest",
            SortType::ByCategory => "byCategory",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortType(pub String);

impl fmt::Display for UnknownSortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort type: {}", self.0)
    }
}

impl std::error::Error for UnknownSortType {}

impl FromStr for SortType {
    type Err = UnknownSortType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SortType::ALL
            .into_iter()
            .find(|sort| sort.as_str() == value)
            .ok_or_else(|| UnknownSortType(value.to_string()))
    }
}

/// Which half of the task map is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Active,
    Completed,
}

fn compare_due(a: &Task, b: &Task) -> Ordering {
    match (a.due_time, b.due_time) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Orders `tasks` in place. Both passes are stable, so pinning only moves
/// priority groups and keeps the primary order inside each group.
pub fn sort_tasks(tasks: &mut [&Task], sort: SortType, pin_high_priority: bool, doc: &Document) {
    match sort {
        SortType::OldestFirst => tasks.sort_by_key(|task| task.id),
        SortType::NewestFirst => tasks.sort_by_key(|task| Reverse(task.id)),
        SortType::DueSoonest => tasks.sort_by(|a, b| compare_due(a, b)),
        SortType::ByCategory => tasks.sort_by_key(|task| {
            doc.category_position(&task.category)
                .unwrap_or(usize::MAX)
        }),
    }
    if pin_high_priority {
        tasks.sort_by_key(|task| Reverse(task.priority));
    }
}

/// Tasks for `view` in display order. Completed tasks are listed most
/// recently completed first regardless of the sort settings.
pub fn visible_tasks(
    doc: &Document,
    view: View,
    sort: SortType,
    pin_high_priority: bool,
) -> Vec<&Task> {
    match view {
        View::Active => {
            let mut tasks: Vec<&Task> = doc.tasks.values().filter(|t| t.is_active()).collect();
            sort_tasks(&mut tasks, sort, pin_high_priority, doc);
            tasks
        }
        View::Completed => {
            let mut tasks: Vec<&Task> = doc.tasks.values().filter(|t| !t.is_active()).collect();
            tasks.sort_by_key(|task| Reverse(task.completion_time));
            tasks
        }
    }
}
