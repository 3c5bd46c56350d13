use std::{env, net::SocketAddr};

use anyhow::Result;
use splus_ics_core::config::SourceConfig;
use tokio::net::TcpListener;

use crate::handlers::create_app;

pub async fn start_server(config: SourceConfig) -> Result<()> {
    let app = create_app(config)?;

    let port = env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Splus ICS Server starting on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
