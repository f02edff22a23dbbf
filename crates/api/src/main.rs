use anyhow::Context;

use shopfront_api::app::{build_app, services::AppServices};
use shopfront_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopfront_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = AppServices::from_config(&config.store)
        .await
        .context("failed to initialise store")?;
    let backend = services.backend();

    let app = build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, backend, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
