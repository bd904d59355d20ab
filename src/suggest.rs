use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::SuggestError;

pub const MAX_SUBTASKS: usize = 5;

/// Returned whenever the model cannot produce usable subtasks.
pub const FALLBACK_SUBTASKS: [&str; MAX_SUBTASKS] = [
    "Plan the approach and gather requirements",
    "Research best practices and resources",
    "Break the task into smaller actionable steps",
    "Set milestones and deadlines",
    "Review and refine the plan",
];

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("upstream reply contained no text")]
    EmptyReply,
}

/// A single-shot text completion backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The model answered but nothing survived parsing.
    EmptyReply,
    /// The upstream call itself failed.
    Upstream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionSource {
    Generated,
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestions {
    pub subtasks: Vec<String>,
    pub source: SuggestionSource,
}

impl Suggestions {
    fn fallback(reason: FallbackReason) -> Self {
        Self {
            subtasks: FALLBACK_SUBTASKS.iter().map(|s| s.to_string()).collect(),
            source: SuggestionSource::Fallback(reason),
        }
    }
}

/// Turns a task title and description into a short list of subtasks.
///
/// Without a generator (no credential configured) every request fails with
/// [`SuggestError::ServiceUnavailable`]. Upstream failures never escape: they
/// are replaced by [`FALLBACK_SUBTASKS`].
#[derive(Clone)]
pub struct SuggestionService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl SuggestionService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn suggest(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Suggestions, SuggestError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SuggestError::InvalidRequest("Task title is required".into()));
        }
        let Some(generator) = &self.generator else {
            return Err(SuggestError::ServiceUnavailable(
                "Gemini API key not configured".into(),
            ));
        };

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let prompt = build_prompt(title, description);

        match generator.generate(&prompt).await {
            Ok(text) => {
                let subtasks = parse_subtasks(&text);
                if subtasks.is_empty() {
                    tracing::warn!(title, "model reply had no usable lines, using fallback");
                    return Ok(Suggestions::fallback(FallbackReason::EmptyReply));
                }
                tracing::debug!(title, count = subtasks.len(), "generated subtasks");
                Ok(Suggestions {
                    subtasks,
                    source: SuggestionSource::Generated,
                })
            }
            Err(err) => {
                tracing::warn!(title, error = %err, "generating subtasks failed, using fallback");
                Ok(Suggestions::fallback(FallbackReason::Upstream))
            }
        }
    }
}

pub fn build_prompt(title: &str, description: Option<&str>) -> String {
    let description = description
        .map(|d| format!("Description: \"{d}\""))
        .unwrap_or_default();

    format!(
        r#"
You are a productivity assistant. Break down the following task into exactly 3-5 smaller, specific, and actionable subtasks.

Task: "{title}"
{description}

Requirements:
- Each subtask should be a clear, actionable step
- Subtasks should be specific and measurable
- Return ONLY the subtasks, one per line
- No numbering, bullets, or extra formatting
- Maximum 5 subtasks

Example format:
Research company background and recent news
Practice coding problems on LeetCode
Prepare 5 thoughtful questions to ask interviewer
Review resume and prepare STAR method examples
Choose professional outfit and prepare materials
"#
    )
}

/// Keeps the first non-empty, unnumbered lines of a model reply.
pub fn parse_subtasks(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_numbered(line))
        .take(MAX_SUBTASKS)
        .map(str::to_string)
        .collect()
}

// Matches a leading `digits.` marker such as "1." or "12.".
fn is_numbered(line: &str) -> bool {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.len() < line.len() && rest.starts_with('.')
}
