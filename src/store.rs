use chrono::Utc;

use crate::db::Database;
use crate::error::StoreError;
use crate::models::{clean_text, NewTask, Subtask, Task, TaskPatch, TaskStatus};

/// Key under which the whole task collection is stored.
pub const STORAGE_KEY: &str = "smart-tasks";

/// In-memory task collection, written back to storage after every mutation.
pub struct TaskStore {
    db: Database,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Loads the collection from `db`. Missing or unreadable content starts an
    /// empty collection.
    pub fn open(db: Database) -> Self {
        let tasks = match db.get(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => tasks,
                Err(err) => {
                    tracing::warn!(error = %err, "saved tasks are malformed, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "reading saved tasks failed, starting empty");
                Vec::new()
            }
        };
        tracing::info!(count = tasks.len(), "task store loaded");
        Self { db, tasks }
    }

    pub fn list(&self, status: Option<TaskStatus>) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| status.map_or(true, |s| task.status == s))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn create(&mut self, new: NewTask) -> Result<Task, StoreError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(StoreError::Validation("Task title is required".into()));
        }

        let task = Task {
            id: self.next_id(),
            title: title.to_string(),
            description: clean_text(new.description),
            status: TaskStatus::Pending,
            due_date: new.due_date,
            created_at: Utc::now(),
            subtasks: Vec::new(),
        };
        self.tasks.push(task.clone());
        self.persist()?;
        Ok(task)
    }

    /// Shallow-merges `patch` onto the task. `Ok(None)` when no task matches,
    /// whatever the patch holds.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>, StoreError> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(StoreError::Validation("Task title is required".into()));
            }
            task.title = title.to_string();
        }
        if let Some(description) = patch.description {
            task.description = clean_text(description);
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }

        let updated = task.clone();
        self.persist()?;
        Ok(Some(updated))
    }

    /// Returns whether a task was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Appends the samples whose ids are not present yet and returns how many
    /// were added.
    pub fn seed_samples(&mut self, samples: Vec<Task>) -> Result<usize, StoreError> {
        let fresh: Vec<Task> = samples
            .into_iter()
            .filter(|sample| self.get(&sample.id).is_none())
            .collect();
        let added = fresh.len();
        if added > 0 {
            self.tasks.extend(fresh);
            self.persist()?;
        }
        Ok(added)
    }

    /// Replaces the task's subtasks wholesale, dropping earlier completion state.
    pub fn replace_subtasks(
        &mut self,
        id: &str,
        titles: &[String],
    ) -> Result<Option<Task>, StoreError> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        task.subtasks = titles
            .iter()
            .enumerate()
            .map(|(ordinal, title)| Subtask::new(id, ordinal, title.as_str()))
            .collect();

        let updated = task.clone();
        self.persist()?;
        Ok(Some(updated))
    }

    pub fn set_subtask_completed(
        &mut self,
        task_id: &str,
        subtask_id: &str,
        completed: bool,
    ) -> Result<Option<Task>, StoreError> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == task_id) else {
            return Ok(None);
        };
        let Some(subtask) = task.subtasks.iter_mut().find(|s| s.id == subtask_id) else {
            return Ok(None);
        };
        subtask.completed = completed;

        let updated = task.clone();
        self.persist()?;
        Ok(Some(updated))
    }

    fn next_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        while self.get(&millis.to_string()).is_some() {
            millis += 1;
        }
        millis.to_string()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.tasks)?;
        self.db.set(STORAGE_KEY, &raw)?;
        Ok(())
    }
}
