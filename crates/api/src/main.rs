use anyhow::Context;

use tollgate_api::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tollgate_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let bind_addr = settings.bind_addr;

    let app = tollgate_api::app::build_app(settings)?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
