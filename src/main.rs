use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use visa_guide::config::Config;
use visa_guide::content::{FsContentStore, Resolver};
use visa_guide::localization::Localizer;
use visa_guide::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("visa_guide=info".parse()?),
        )
        .init();

    info!("Starting visa guide service");

    let config = Config::from_env()?;
    info!(
        "Serving content from {} (templates: {}), base language {}",
        config.content_dir.display(),
        config.templates_dir.display(),
        config.base_language
    );

    let store = FsContentStore::new(config.content_dir.clone(), config.templates_dir.clone());
    let client = reqwest::Client::new();

    let state = AppState {
        resolver: Arc::new(Resolver::new(Arc::new(store))),
        localizer: Arc::new(Localizer::from_config(&config, client)),
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, server::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
