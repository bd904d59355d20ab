use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::api;
use crate::error::ApiError;
use crate::models::Task;
use crate::pages;
use crate::store::TaskStore;
use crate::suggest::SuggestionService;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<TaskStore>>,
    pub suggestions: SuggestionService,
}

impl AppState {
    pub fn new(store: TaskStore, suggestions: SuggestionService) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            suggestions,
        }
    }

    /// Never hold the guard across an `.await`.
    pub fn store(&self) -> Result<MutexGuard<'_, TaskStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::Internal("task store lock poisoned".into()))
    }

    /// Asks for fresh subtasks for a saved task and replaces its current ones.
    pub async fn suggest_for_task(&self, id: &str) -> Result<Task, ApiError> {
        let (title, description) = {
            let store = self.store()?;
            let task = store.get(id).ok_or_else(|| ApiError::task_not_found(id))?;
            (task.title.clone(), task.description.clone())
        };

        let suggestions = self
            .suggestions
            .suggest(&title, description.as_deref())
            .await?;
        tracing::debug!(id, source = ?suggestions.source, "replacing subtasks");

        let mut store = self.store()?;
        store
            .replace_subtasks(id, &suggestions.subtasks)?
            .ok_or_else(|| ApiError::task_not_found(id))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/add", post(pages::add_task))
        .route("/edit", post(pages::edit_task))
        .route("/toggle", post(pages::toggle_task))
        .route("/delete", post(pages::delete_task))
        .route("/suggest", post(pages::suggest_subtasks))
        .route("/subtask", post(pages::toggle_subtask))
        .route("/samples", post(pages::load_samples))
        .route("/api/generate-subtasks", post(api::generate_subtasks))
        .route("/api/tasks", get(api::list_tasks).post(api::create_task))
        .route("/api/tasks/samples", post(api::seed_samples))
        .route(
            "/api/tasks/:id",
            patch(api::update_task).delete(api::delete_task),
        )
        .route("/api/tasks/:id/subtasks", post(api::suggest_subtasks))
        .route(
            "/api/tasks/:id/subtasks/:subtask_id",
            patch(api::update_subtask),
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::testing::state_with;
    use super::*;
    use crate::models::NewTask;
    use crate::suggest::testing::ScriptedGenerator;
    use crate::suggest::FALLBACK_SUBTASKS;

    #[tokio::test]
    async fn suggestion_replaces_subtasks_of_saved_task() {
        let state = state_with(Some(ScriptedGenerator::replying("Pick dates\nBook flights")));
        let id = state
            .store()
            .unwrap()
            .create(NewTask {
                title: "Plan a trip".into(),
                ..NewTask::default()
            })
            .unwrap()
            .id;

        let task = state.suggest_for_task(&id).await.unwrap();
        let titles: Vec<&str> = task.subtasks.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Pick dates", "Book flights"]);
        assert_eq!(task.subtasks[1].id, format!("{id}-subtask-1"));
        assert_eq!(state.store().unwrap().get(&id).unwrap(), &task);
    }

    #[tokio::test]
    async fn failed_upstream_still_fills_fallback_subtasks() {
        let state = state_with(Some(ScriptedGenerator::failing()));
        let id = state
            .store()
            .unwrap()
            .create(NewTask {
                title: "Plan a trip".into(),
                ..NewTask::default()
            })
            .unwrap()
            .id;

        let task = state.suggest_for_task(&id).await.unwrap();
        assert_eq!(task.subtasks.len(), FALLBACK_SUBTASKS.len());
        assert_eq!(task.subtasks[0].title, FALLBACK_SUBTASKS[0]);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let state = state_with(Some(ScriptedGenerator::replying("x")));
        let err = state.suggest_for_task("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
