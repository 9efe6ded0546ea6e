use std::net::SocketAddr;
use std::sync::Arc;

use common::{Clock, SystemClock};
use podium_server::config::AppConfig;
use podium_server::database::{ensure_indexes, init_db};
use podium_server::phase::run_phase_scheduler;
use podium_server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;
    ensure_indexes(&db).await?;
    info!("Database ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if config.scheduler.enabled {
        tokio::spawn(run_phase_scheduler(
            db.clone(),
            clock.clone(),
            config.scheduler.clone(),
        ));
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::build(db, config, clock)?;
    let app = podium_server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
