use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod db;
mod error;
mod gemini;
mod models;
mod pages;
mod samples;
mod store;
mod suggest;
mod web;

use config::Config;
use db::Database;
use store::TaskStore;
use web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smarttasks=info")),
        )
        .init();

    let config = Config::parse();
    let db = Database::connect(&config.db_path)?;
    let store = TaskStore::open(db);
    let suggestions = config.suggestion_service();
    if !suggestions.is_configured() {
        tracing::warn!("GEMINI_API_KEY is not set, subtask suggestions are disabled");
    }

    let app = web::router(AppState::new(store, suggestions));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(
        addr = %config.bind,
        db = %config.db_path.display(),
        "smarttasks running on http://{}",
        config.bind
    );

    axum::serve(listener, app).await?;

    Ok(())
}
