use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mpesa_relay::build_router;
use mpesa_relay::config::AppConfig;
use mpesa_relay::services::mpesa_service::MpesaService;
use mpesa_relay::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.log_summary();
    tracing::debug!("Config: {}", config.get_config_info());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    let mpesa_service = MpesaService::new(config).context("failed to build M-Pesa service")?;
    let app = build_router(AppState::new(mpesa_service));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("🚀 Server starting on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
