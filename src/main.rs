//! Workbench agent - conversational agent dispatch service
//!
//! Receives commands and chat messages for conversations, answers them
//! according to a configured behavior, and keeps an append-only history.

mod agent;
mod api;
mod db;
mod moderation;

use agent::{AgentConfig, DEFAULT_AGENT_ID};
use api::{create_router, AppState};
use db::Database;
use moderation::{build_provider, ModerationConfig, ModerationProvider};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workbench_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("WORKBENCH_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.workbench-agent/history.db")
    });

    let port: u16 = std::env::var("WORKBENCH_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let agent_id = std::env::var("AGENT_ID").unwrap_or_else(|_| DEFAULT_AGENT_ID.to_string());
    let agent_config = AgentConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    let moderation = build_provider(&ModerationConfig::from_env());

    tracing::info!(
        agent_id = %agent_id,
        behavior = %agent_config.behavior,
        commands_enabled = agent_config.commands_enabled,
        reply_to_agents = agent_config.reply_to_agents,
        moderation = %moderation.name(),
        "Agent configured"
    );

    let state = AppState::new(agent_id, agent_config, db, moderation);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Workbench agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
