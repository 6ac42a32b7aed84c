use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use stockyard_infra::AppConfig;

const JOURNAL_SYNC_PERIOD: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    stockyard_observability::init(config.log_format);

    let services = Arc::new(stockyard_api::app::services::build_services(
        config.code_prefixes.clone(),
    ));
    stockyard_api::app::services::spawn_journal_sync(&services, JOURNAL_SYNC_PERIOD);
    let app = stockyard_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
