use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use taskmanager_db::DbConfig;
use taskmanager_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    let db_config = DbConfig::from_url(&config.database_url)?;
    let db = taskmanager_db::open_database(&db_config)
        .await
        .inspect_err(|e| error!("failed to open database: {e}"))?;

    // Connectivity probe: report, but keep serving.
    if let Err(e) = db.ping().await {
        error!("database connection error: {e}");
    }

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(
        backend = db_config.backend_name(),
        "taskmanager-server listening on http://{addr}"
    );

    taskmanager_server::serve(listener, db).await
}
