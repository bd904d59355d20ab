use chrono::{DateTime, Duration, Utc};

use crate::models::{Task, TaskStatus};

/// Example tasks offered to first-time users, due dates relative to `now`.
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let sample = |id: &str, title: &str, description: &str, due_in_days: Option<i64>| Task {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        status: TaskStatus::Pending,
        due_date: due_in_days.map(|days| now + Duration::days(days)),
        created_at: now,
        subtasks: Vec::new(),
    };

    vec![
        sample(
            "sample-1",
            "Prepare for job interview",
            "Technical interview for React developer position at a tech startup",
            Some(7),
        ),
        sample(
            "sample-2",
            "Plan birthday party",
            "Organize a surprise birthday party for my friend's 30th birthday",
            Some(14),
        ),
        sample(
            "sample-3",
            "Learn Next.js",
            "Master Next.js framework for building modern web applications",
            None,
        ),
    ]
}
