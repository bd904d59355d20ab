use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{NewTask, Task, TaskPatch, TaskStatus};
use crate::samples::sample_tasks;
use crate::web::AppState;

#[derive(Deserialize)]
pub struct IndexQuery {
    tab: Option<String>,
}

#[derive(Deserialize)]
pub struct AddForm {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    due_date: String,
}

#[derive(Deserialize)]
pub struct EditForm {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    due_date: String,
    status: TaskStatus,
}

#[derive(Deserialize)]
pub struct IdForm {
    id: String,
}

#[derive(Deserialize)]
pub struct SubtaskForm {
    id: String,
    subtask_id: String,
}

const STYLE: &str = r#"
    :root {
      color-scheme: light;
      font-family: "Inter", system-ui, -apple-system, sans-serif;
      background: #f4f5f7;
    }
    body { margin: 0; padding: 32px; display: flex; justify-content: center; }
    .app {
      width: min(760px, 100%);
      background: #ffffff;
      border-radius: 16px;
      box-shadow: 0 24px 48px rgba(15, 23, 42, 0.08);
      padding: 28px;
    }
    h1 { margin: 0 0 16px 0; font-size: 28px; letter-spacing: -0.02em; }
    .subtitle { color: #64748b; margin-bottom: 24px; }
    form.add { display: grid; gap: 12px; margin-bottom: 24px; }
    input[type="text"], input[type="date"], textarea, select {
      padding: 10px 12px;
      border-radius: 10px;
      border: 1px solid #e2e8f0;
      font-size: 15px;
      font-family: inherit;
    }
    button {
      border: none;
      border-radius: 10px;
      padding: 10px 14px;
      background: #111827;
      color: white;
      font-weight: 600;
      cursor: pointer;
    }
    .empty { padding: 16px; border-radius: 12px; background: #eff6ff; color: #1d4ed8; margin-bottom: 24px; }
    .tabs { display: grid; grid-template-columns: 1fr 1fr; gap: 12px; margin-bottom: 16px; }
    .tabs a {
      text-align: center; padding: 10px; border-radius: 10px;
      background: #f1f5f9; color: #0f172a; text-decoration: none; font-weight: 600;
    }
    .tabs a.active { background: #111827; color: #ffffff; }
    .task-list { display: grid; gap: 12px; }
    .task { padding: 14px 16px; border-radius: 12px; background: #f8fafc; border: 1px solid #e2e8f0; }
    .task.overdue { background: #fef2f2; border-color: #fecaca; }
    .task.done .title { text-decoration: line-through; color: #64748b; }
    .task .title { font-weight: 600; }
    .task .description { color: #475569; font-size: 14px; margin-top: 4px; }
    .meta { display: flex; flex-wrap: wrap; gap: 8px; margin: 10px 0; font-size: 12px; }
    .badge {
      text-transform: uppercase; letter-spacing: 0.08em; color: #0f172a;
      background: #e2e8f0; padding: 4px 8px; border-radius: 999px;
    }
    .badge.late { background: #fee2e2; color: #991b1b; }
    .actions { display: flex; flex-wrap: wrap; gap: 8px; }
    .actions form { margin: 0; }
    .actions button { background: #e2e8f0; color: #0f172a; padding: 8px 12px; }
    .actions button.delete { background: #fee2e2; color: #991b1b; }
    .subtasks { list-style: none; padding: 12px; margin: 12px 0 0 0; background: #f1f5f9; border-radius: 10px; }
    .subtasks li form { display: flex; gap: 8px; align-items: center; margin: 4px 0; }
    .subtasks button { background: transparent; color: #0f172a; padding: 0 4px; }
    .subtasks .checked { text-decoration: line-through; color: #64748b; }
    details.edit form { display: grid; gap: 8px; margin-top: 8px; }
"#;

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, ApiError> {
    let tab = match query.tab.as_deref() {
        Some("completed") => TaskStatus::Completed,
        _ => TaskStatus::Pending,
    };
    let (tasks, pending, completed) = {
        let store = state.store()?;
        (
            store.list(Some(tab)),
            store.list(Some(TaskStatus::Pending)).len(),
            store.list(Some(TaskStatus::Completed)).len(),
        )
    };
    Ok(Html(render_index(
        &tasks,
        tab,
        pending,
        completed,
        state.suggestions.is_configured(),
        Utc::now(),
    )))
}

fn render_index(
    tasks: &[Task],
    tab: TaskStatus,
    pending: usize,
    completed: usize,
    suggestions_enabled: bool,
    now: DateTime<Utc>,
) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>smarttasks</title>
  <style>{STYLE}</style>
</head>
<body>
  <div class="app">
    <h1>smarttasks</h1>
    <div class="subtitle">Track your tasks and let AI break them into steps.</div>
    <form class="add" method="post" action="/add">
      <input type="text" name="title" placeholder="Enter task title" required />
      <textarea name="description" rows="3" placeholder="Enter task description"></textarea>
      <input type="date" name="due_date" />
      <button type="submit">Add Task</button>
    </form>
"#
    ));

    if pending + completed == 0 {
        body.push_str(
            r#"    <div class="empty">
      <p>Hello! You have no tasks.</p>
      <p>Try the AI-powered subtask suggestions with some sample tasks.</p>
      <form method="post" action="/samples"><button type="submit">Load Sample Tasks</button></form>
    </div>
"#,
        );
    }

    let (pending_class, completed_class) = match tab {
        TaskStatus::Pending => ("active", ""),
        TaskStatus::Completed => ("", "active"),
    };
    body.push_str(&format!(
        r#"    <div class="tabs">
      <a class="{pending_class}" href="/?tab=pending">Pending Tasks ({pending})</a>
      <a class="{completed_class}" href="/?tab=completed">Completed Tasks ({completed})</a>
    </div>
    <div class="task-list">
"#
    ));

    if tasks.is_empty() {
        body.push_str(&format!(
            "<div class=\"subtitle\">No {tab} tasks.</div>"
        ));
    }
    for task in tasks {
        body.push_str(&render_task(task, suggestions_enabled, now));
    }

    body.push_str(
        r#"    </div>
  </div>
</body>
</html>"#,
    );
    body
}

fn render_task(task: &Task, suggestions_enabled: bool, now: DateTime<Utc>) -> String {
    let overdue = task.is_overdue(now);
    let mut classes = String::from("task");
    if task.status == TaskStatus::Completed {
        classes.push_str(" done");
    }
    if overdue {
        classes.push_str(" overdue");
    }
    let id = html_escape(&task.id);

    let mut out = format!(
        r#"<div class="{classes}">
  <div class="title">{title}</div>
"#,
        title = html_escape(&task.title),
    );
    if let Some(description) = &task.description {
        out.push_str(&format!(
            "  <div class=\"description\">{}</div>\n",
            html_escape(description)
        ));
    }

    out.push_str(&format!(
        "  <div class=\"meta\">\n    <span class=\"badge\">{}</span>\n",
        task.status
    ));
    if let Some(due) = task.due_date {
        let badge = if overdue { "badge late" } else { "badge" };
        out.push_str(&format!(
            "    <span class=\"{badge}\">Due {}</span>\n",
            due.format("%b %d, %Y")
        ));
    }
    out.push_str(&format!(
        "    <span>Created {}</span>\n  </div>\n",
        task.created_at.format("%b %d, %Y %H:%M")
    ));

    let toggle_label = match task.status {
        TaskStatus::Pending => "Complete",
        TaskStatus::Completed => "Reopen",
    };
    out.push_str(&format!(
        r#"  <div class="actions">
    <form method="post" action="/toggle">
      <input type="hidden" name="id" value="{id}" />
      <button type="submit">{toggle_label}</button>
    </form>
"#
    ));
    if suggestions_enabled {
        out.push_str(&format!(
            r#"    <form method="post" action="/suggest">
      <input type="hidden" name="id" value="{id}" />
      <button type="submit">Suggest Subtasks</button>
    </form>
"#
        ));
    }
    out.push_str(&format!(
        r#"    <form method="post" action="/delete">
      <input type="hidden" name="id" value="{id}" />
      <button class="delete" type="submit">Delete</button>
    </form>
  </div>
"#
    ));

    if !task.subtasks.is_empty() {
        out.push_str(&format!(
            "  <ul class=\"subtasks\" title=\"{} of {} done\">\n",
            task.completed_subtasks(),
            task.subtasks.len()
        ));
        for subtask in &task.subtasks {
            let (mark, class) = if subtask.completed {
                ("&#9745;", "checked")
            } else {
                ("&#9744;", "")
            };
            out.push_str(&format!(
                r#"    <li><form method="post" action="/subtask">
      <input type="hidden" name="id" value="{id}" />
      <input type="hidden" name="subtask_id" value="{subtask_id}" />
      <button type="submit">{mark}</button><span class="{class}">{title}</span>
    </form></li>
"#,
                subtask_id = html_escape(&subtask.id),
                title = html_escape(&subtask.title),
            ));
        }
        out.push_str("  </ul>\n");
    }

    out.push_str(&render_edit_form(task));
    out.push_str("</div>\n");
    out
}

fn render_edit_form(task: &Task) -> String {
    let selected = |status: TaskStatus| {
        if task.status == status {
            " selected"
        } else {
            ""
        }
    };
    format!(
        r#"  <details class="edit">
    <summary>Edit</summary>
    <form method="post" action="/edit">
      <input type="hidden" name="id" value="{id}" />
      <input type="text" name="title" value="{title}" required />
      <textarea name="description" rows="2">{description}</textarea>
      <input type="date" name="due_date" value="{due}" />
      <select name="status">
        <option value="pending"{pending}>Pending</option>
        <option value="completed"{completed}>Completed</option>
      </select>
      <button type="submit">Save</button>
    </form>
  </details>
"#,
        id = html_escape(&task.id),
        title = html_escape(&task.title),
        description = html_escape(task.description.as_deref().unwrap_or_default()),
        due = task
            .due_date
            .map(|due| due.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        pending = selected(TaskStatus::Pending),
        completed = selected(TaskStatus::Completed),
    )
}

pub async fn add_task(
    State(state): State<AppState>,
    Form(form): Form<AddForm>,
) -> Result<Response, ApiError> {
    let new = NewTask {
        title: form.title,
        description: Some(form.description),
        due_date: parse_due_date(&form.due_date)?,
    };
    state.store()?.create(new)?;
    Ok(redirect_home())
}

pub async fn edit_task(
    State(state): State<AppState>,
    Form(form): Form<EditForm>,
) -> Result<Response, ApiError> {
    let patch = TaskPatch {
        title: Some(form.title),
        description: Some(Some(form.description)),
        status: Some(form.status),
        due_date: Some(parse_due_date(&form.due_date)?),
    };
    state.store()?.update(&form.id, patch)?;
    Ok(redirect_home())
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> Result<Response, ApiError> {
    let mut store = state.store()?;
    if let Some(status) = store.get(&form.id).map(|task| task.status) {
        store.update(&form.id, TaskPatch::status(status.toggled()))?;
    }
    Ok(redirect_home())
}

pub async fn delete_task(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> Result<Response, ApiError> {
    state.store()?.delete(&form.id)?;
    Ok(redirect_home())
}

pub async fn suggest_subtasks(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> Result<Response, ApiError> {
    state.suggest_for_task(&form.id).await?;
    Ok(redirect_home())
}

pub async fn toggle_subtask(
    State(state): State<AppState>,
    Form(form): Form<SubtaskForm>,
) -> Result<Response, ApiError> {
    let mut store = state.store()?;
    let current = store
        .get(&form.id)
        .and_then(|task| task.subtasks.iter().find(|s| s.id == form.subtask_id))
        .map(|subtask| subtask.completed);
    if let Some(completed) = current {
        store.set_subtask_completed(&form.id, &form.subtask_id, !completed)?;
    }
    Ok(redirect_home())
}

pub async fn load_samples(State(state): State<AppState>) -> Result<Response, ApiError> {
    let added = state.store()?.seed_samples(sample_tasks(Utc::now()))?;
    tracing::info!(added, "sample tasks loaded");
    Ok(redirect_home())
}

/// Reads an `<input type="date">` value as midnight UTC. Blank means no date.
fn parse_due_date(value: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid due date `{value}`")))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight)))
}

fn redirect_home() -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, "/")]).into_response()
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
