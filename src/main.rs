use anyhow::Context;

mod app;
mod auth;
mod config;
mod error;
mod local;
mod state;

use crate::config::ServiceMode;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "receptionist=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("run database migrations")?;

    // The local shape stays off the network unless explicitly overridden.
    let default_host = match app_state.config.mode {
        ServiceMode::Local => "127.0.0.1",
        ServiceMode::Remote => "0.0.0.0",
    };
    tracing::info!(mode = ?app_state.config.mode, "service starting");

    let app = app::build_app(app_state);
    app::serve(app, default_host).await
}
