use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub task_id: String,
    pub completed: bool,
}

impl Subtask {
    pub fn new(task_id: &str, ordinal: usize, title: impl Into<String>) -> Self {
        Self {
            id: subtask_id(task_id, ordinal),
            title: title.into(),
            task_id: task_id.to_string(),
            completed: false,
        }
    }
}

pub fn subtask_id(task_id: &str, ordinal: usize) -> String {
    format!("{task_id}-subtask-{ordinal}")
}

/// A tracked unit of work.
///
/// Deserialization goes through [`StoredTask`] so that older records, whose
/// subtasks were bare strings or missing, load in the structured form.
/// Subtask ids are always rebuilt from the owner id and position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredTask")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.due_date.is_some_and(|due| due < now)
    }

    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: TaskStatus,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    subtasks: Option<Vec<StoredSubtask>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSubtask {
    Title(String),
    Full(StoredSubtaskFields),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSubtaskFields {
    title: String,
    #[serde(default)]
    completed: bool,
}

impl From<StoredTask> for Task {
    fn from(stored: StoredTask) -> Self {
        let subtasks = stored
            .subtasks
            .unwrap_or_default()
            .into_iter()
            .map(|entry| match entry {
                StoredSubtask::Title(title) => (title, false),
                StoredSubtask::Full(fields) => (fields.title, fields.completed),
            })
            .filter(|(title, _)| !title.trim().is_empty())
            .enumerate()
            .map(|(ordinal, (title, completed))| Subtask {
                id: subtask_id(&stored.id, ordinal),
                title: title.trim().to_string(),
                task_id: stored.id.clone(),
                completed,
            })
            .collect();

        Task {
            id: stored.id,
            title: stored.title,
            description: stored.description,
            status: stored.status,
            due_date: stored.due_date,
            created_at: stored.created_at,
            subtasks,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves a field alone; for the clearable fields
/// `Some(None)` (JSON `null`) clears it. Subtasks are not patchable: they
/// change only through replacement or their completed flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims a free-text field and turns blank input into `None`.
pub fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
