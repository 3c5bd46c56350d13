mod handlers;
mod server;

use std::env;

use anyhow::Result;
use splus_ics_core::config::SourceConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "splus_ics_server=info,splus_ics_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match env::var("SPLUS_CONFIG") {
        Ok(path) => SourceConfig::from_file(&path)?,
        Err(_) => SourceConfig::default(),
    };
    if let Ok(base_url) = env::var("SPLUS_BASE_URL") {
        config = config.with_base_url(base_url)?;
    }
    if let Ok(timeout) = env::var("SPLUS_TIMEOUT_SECS") {
        let timeout = timeout
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("SPLUS_TIMEOUT_SECS must be a number of seconds"))?;
        config = config.with_timeout(timeout);
    }

    tracing::info!("Using Splus at {}", config.base_url);
    server::start_server(config).await
}
