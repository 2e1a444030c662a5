use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bbdata_server::config::AppConfig;
use bbdata_server::state::AppState;
use bbdata_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let dates = config
        .dates
        .to_date_config()
        .context("Invalid date bounds")?;

    let db = database::init_db(&config.database.url).await?;
    seed::seed_reference_data(&db).await?;
    seed::ensure_indexes(&db).await?;
    if let Some(password) = &config.auth.bootstrap_admin_password {
        seed::seed_admin(&db, password).await?;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(db, config, dates);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("BBData server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
