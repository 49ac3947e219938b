mod app;
mod auth;
mod config;
mod db;
mod error;
mod images;
mod recipes;
mod slug;
mod state;
mod storage;
mod taxonomy;
mod users;

#[cfg(test)]
mod testing;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipebox=debug,axum=info,tower_http=info".to_string());
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
    db::run_migrations(&app_state.db).await?;

    if std::env::args().nth(1).as_deref() == Some("seed") {
        taxonomy::seed::run(&app_state.db).await?;
        return Ok(());
    }

    app::serve(app::build_app(app_state)).await
}
