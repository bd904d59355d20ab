use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::gemini::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::suggest::{SuggestionService, TextGenerator};

#[derive(Debug, Clone, Parser)]
#[command(name = "smarttasks", about = "Personal task manager with AI subtask suggestions")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "SMARTTASKS_BIND", default_value = "0.0.0.0:5876")]
    pub bind: SocketAddr,

    /// SQLite file holding the saved task collection
    #[arg(long = "db", env = "SMARTTASKS_DB", default_value = "smarttasks.db")]
    pub db_path: PathBuf,

    /// Gemini API key; subtask suggestions are unavailable without it
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub gemini_base_url: String,
}

impl Config {
    /// The configured key, treating an empty value as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn suggestion_service(&self) -> SuggestionService {
        let generator = self.api_key().map(|key| {
            Arc::new(GeminiClient::new(
                key,
                self.gemini_model.as_str(),
                &self.gemini_base_url,
            )) as Arc<dyn TextGenerator>
        });
        SuggestionService::new(generator)
    }
}
