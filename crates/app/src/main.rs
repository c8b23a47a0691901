mod announce;
mod error;
mod issues;
mod router;
mod server;
mod service;
mod telemetry;

use std::time::Duration;

use issue_desk_notify::NotifyClient;
use issue_desk_storage::Database;
use issue_desk_util::{load_env_file, AppConfig};
use tracing::{error, info};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database_url = config.database_url();
    let database = Database::connect(&database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", url = %database_url, "database ready");

    let notifier = build_notifier(&config)?;
    let state = router::AppState::new(metrics, database.clone(), notifier);

    let addr = config.bind_address();
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let served = server::serve(
        listener,
        router::app_router(state),
        server::shutdown_signal(),
        server::DRAIN_TIMEOUT,
    )
    .await;

    database.close().await;

    if let Err(err) = served {
        error!(stage = "app", error = %err, "server stopped with error");
        return Err(err.into());
    }

    info!(stage = "app", "server stopped");
    Ok(())
}

fn build_notifier(config: &AppConfig) -> Result<Option<NotifyClient>, Box<dyn std::error::Error>> {
    let Some(base_url) = config.notify_base_url.as_deref() else {
        info!(stage = "notify", "NOTIFY_BASE_URL not set, new-issue announcements disabled");
        return Ok(None);
    };

    let http = reqwest::Client::builder().timeout(NOTIFY_TIMEOUT).build()?;
    let client = NotifyClient::from_base_url(base_url, http)?;
    info!(stage = "notify", base_url = %client.base_url(), "new-issue announcements enabled");
    Ok(Some(client))
}
