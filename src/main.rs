use proxy_mediator::{app, config::Settings};
use eyre::{Context, Result};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv_flow::dotenv_flow().ok();

    let settings = Settings::from_env().context("invalid configuration")?;
    config_tracing(&settings.log_level)?;

    tracing::info!(endpoint = %settings.endpoint, "starting proxy mediator");

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(&addr).await.context("failed to bind listener")?;
    tracing::debug!("listening on {}", addr);

    let application = app(settings).await?;

    axum::serve(listener, application.router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down gracefully");
    application.bootstrap_task.abort();
    application.bootstrap.stop_retriever().await;
    if let Some(persistence) = &application.persistence {
        if let Err(e) = persistence.save(&application.app.registry).await {
            tracing::warn!(error = %e, "failed to persist connections on shutdown");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn config_tracing(log_level: &str) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1")
    }
    eyre::install()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(format!("{log_level},tower_http::trace=debug")).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    Ok(())
}
