use std::env;

use daycare_finance::api::{AppState, create_router};
use daycare_finance::config::ConfigLoader;
use daycare_finance::engine::FinanceEngine;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_DIR: &str = "./config/daycare";
const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("daycare_finance=info"));
    fmt().with_env_filter(filter).init();

    let config_dir =
        env::var("DAYCARE_FINANCE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let bind = env::var("DAYCARE_FINANCE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let config = ConfigLoader::load(&config_dir)?;
    let engine = FinanceEngine::from_config(&config)?;
    for (a, b) in engine.budget_conflicts() {
        tracing::warn!(first = %a, second = %b, "Conflicting budgets in configuration");
    }

    let app = create_router(AppState::new(engine));
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(address = %bind, config = %config_dir, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
