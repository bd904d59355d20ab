use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{NewTask, Task, TaskPatch, TaskStatus};
use crate::samples::sample_tasks;
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    subtasks: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    added: usize,
}

#[derive(Debug, Deserialize)]
pub struct SubtaskUpdate {
    completed: bool,
}

pub async fn generate_subtasks(
    State(state): State<AppState>,
    payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let Json(request) = payload?;
    let title = request.title.unwrap_or_default();
    let suggestions = state
        .suggestions
        .suggest(&title, request.description.as_deref())
        .await?;
    Ok(Json(SuggestResponse {
        subtasks: suggestions.subtasks,
    }))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let tasks = state.store()?.list(status);
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(new) = payload?;
    let task = state.store()?.create(new)?;
    tracing::info!(id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(patch) = payload?;
    let updated = state.store()?.update(&id, patch)?;
    updated.map(Json).ok_or_else(|| ApiError::task_not_found(&id))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store()?.delete(&id)? {
        tracing::info!(%id, "task deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn seed_samples(State(state): State<AppState>) -> Result<Json<SeedResponse>, ApiError> {
    let added = state.store()?.seed_samples(sample_tasks(Utc::now()))?;
    Ok(Json(SeedResponse { added }))
}

pub async fn suggest_subtasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state.suggest_for_task(&id).await.map(Json)
}

pub async fn update_subtask(
    State(state): State<AppState>,
    Path((id, subtask_id)): Path<(String, String)>,
    payload: Result<Json<SubtaskUpdate>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(update) = payload?;
    let updated = state
        .store()?
        .set_subtask_completed(&id, &subtask_id, update.completed)?;
    updated
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("subtask {subtask_id} not found")))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};
    use axum::response::IntoResponse;
    use serde_json::json;

    use super::*;
    use crate::suggest::testing::ScriptedGenerator;
    use crate::suggest::FALLBACK_SUBTASKS;
    use crate::web::testing::{body_json, state_with};

    fn suggest_request(title: Option<&str>) -> Result<Json<SuggestRequest>, JsonRejection> {
        Ok(Json(SuggestRequest {
            title: title.map(str::to_string),
            description: None,
        }))
    }

    #[tokio::test]
    async fn generate_returns_parsed_subtasks() {
        let state = state_with(Some(ScriptedGenerator::replying(
            "Choose destination\n2. skip me\nBook flights\nReserve hotel\nPlan itinerary\nPack\nExtra",
        )));
        let response = generate_subtasks(State(state), suggest_request(Some("Plan a trip")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "subtasks": [
                "Choose destination",
                "Book flights",
                "Reserve hotel",
                "Plan itinerary",
                "Pack"
            ]})
        );
    }

    #[tokio::test]
    async fn generate_without_title_is_bad_request() {
        let generator = ScriptedGenerator::replying("x");
        let state = state_with(Some(generator.clone()));
        let response = generate_subtasks(State(state), suggest_request(None))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Task title is required" })
        );
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn generate_without_credential_is_server_error() {
        let state = state_with(None);
        let response = generate_subtasks(State(state), suggest_request(Some("Plan a trip")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body.get("subtasks").is_none());
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generate_masks_upstream_failure_with_fallback() {
        let state = state_with(Some(ScriptedGenerator::failing()));
        let response = generate_subtasks(State(state), suggest_request(Some("Plan a trip")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "subtasks": FALLBACK_SUBTASKS })
        );
    }

    #[tokio::test]
    async fn task_crud_round_trip() {
        let state = state_with(None);

        let response = create_task(
            State(state.clone()),
            Ok(Json(NewTask {
                title: "Write report".into(),
                description: Some("Q3".into()),
                due_date: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["status"], "pending");
        assert_eq!(created["subtasks"], json!([]));

        let patch: TaskPatch = serde_json::from_value(json!({ "status": "completed" })).unwrap();
        let response = update_task(State(state.clone()), Path(id.clone()), Ok(Json(patch)))
            .await
            .into_response();
        let updated = body_json(response).await;
        assert_eq!(updated["status"], "completed");
        assert_eq!(updated["description"], "Q3");

        let response = list_tasks(
            State(state.clone()),
            Query(ListQuery {
                status: Some("pending".into()),
            }),
        )
        .await
        .into_response();
        assert_eq!(body_json(response).await, json!([]));

        let response = delete_task(State(state.clone()), Path(id.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.store().unwrap().get(&id).is_none());

        let response = delete_task(State(state.clone()), Path(id))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn create_with_blank_title_is_rejected() {
        let state = state_with(None);
        let response = create_task(
            State(state.clone()),
            Ok(Json(NewTask {
                title: "  ".into(),
                ..NewTask::default()
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.store().unwrap().list(None).is_empty());
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let state = state_with(None);
        let response = list_tasks(
            State(state),
            Query(ListQuery {
                status: Some("archived".into()),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_of_missing_task_is_not_found() {
        let state = state_with(None);
        let response = update_task(
            State(state),
            Path("missing".into()),
            Ok(Json(TaskPatch::status(TaskStatus::Completed))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_title_on_missing_task_is_not_found() {
        let state = state_with(None);
        let patch = TaskPatch {
            title: Some("   ".into()),
            ..TaskPatch::default()
        };
        let response = update_task(State(state), Path("missing".into()), Ok(Json(patch)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn seeding_reports_only_new_samples() {
        let state = state_with(None);
        let first = body_json(seed_samples(State(state.clone())).await.into_response()).await;
        let second = body_json(seed_samples(State(state.clone())).await.into_response()).await;
        assert_eq!(first, json!({ "added": 3 }));
        assert_eq!(second, json!({ "added": 0 }));
        assert_eq!(state.store().unwrap().list(None).len(), 3);
    }

    #[tokio::test]
    async fn subtasks_can_be_suggested_and_checked_off() {
        let state = state_with(Some(ScriptedGenerator::replying("Pick dates\nBook flights")));
        let seeded = seed_samples(State(state.clone())).await.into_response();
        assert_eq!(seeded.status(), StatusCode::OK);

        let response = suggest_subtasks(State(state.clone()), Path("sample-2".into()))
            .await
            .into_response();
        let task = body_json(response).await;
        assert_eq!(task["subtasks"][0]["id"], "sample-2-subtask-0");
        assert_eq!(task["subtasks"][0]["completed"], false);

        let response = update_subtask(
            State(state.clone()),
            Path(("sample-2".into(), "sample-2-subtask-1".into())),
            Ok(Json(SubtaskUpdate { completed: true })),
        )
        .await
        .into_response();
        let task = body_json(response).await;
        assert_eq!(task["subtasks"][1]["completed"], true);

        let response = update_subtask(
            State(state),
            Path(("sample-2".into(), "nope".into())),
            Ok(Json(SubtaskUpdate { completed: true })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn json_body<T>(raw: &'static str) -> Result<Json<T>, JsonRejection>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))
            .unwrap();
        Json::<T>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn malformed_json_is_reported_as_error_body() {
        let generator = ScriptedGenerator::replying("x");
        let state = state_with(Some(generator.clone()));
        let response = generate_subtasks(State(state), json_body("{\"title\": ").await)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn patch_cannot_supply_subtasks() {
        let state = state_with(None);
        let id = state
            .store()
            .unwrap()
            .create(NewTask {
                title: "Plan a trip".into(),
                ..NewTask::default()
            })
            .unwrap()
            .id;

        let payload =
            json_body(r#"{"subtasks": [{"id": "dup", "title": ""}, {"id": "dup", "title": "   "}]}"#)
                .await;
        let response = update_task(State(state.clone()), Path(id.clone()), payload)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
        assert!(state.store().unwrap().get(&id).unwrap().subtasks.is_empty());
    }
}
