mod assets;
mod colors;
mod config;
mod error;
mod generator;
mod jobs;
mod models;
mod openai;
mod prompt;
mod routes;
mod storage;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    assets::AssetStore,
    colors::ColorAdvisor,
    config::Config,
    generator::AdGenerator,
    jobs::JobRegistry,
    openai::OpenAiClient,
    prompt::{default_palette, ColorPicker},
    routes::{router, AppState},
    storage::{S3BlobStore, StorageGateway},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    if config.demo_mode() {
        tracing::warn!("OPENAI_API_KEY not set; running in demo mode with placeholder images");
    } else {
        let key = &config.provider.api_key;
        tracing::info!("Using API key: {}...", key.chars().take(10).collect::<String>());
    }

    let client = Arc::new(OpenAiClient::new(config.provider.clone()).context("building HTTP client")?);
    let blob_store = S3BlobStore::new(&config.storage).context("configuring object storage")?;
    let storage = Arc::new(StorageGateway::new(
        Arc::new(blob_store),
        config.storage.bucket.clone(),
        config.storage.presign_expiry_secs,
    ));
    if !storage.ensure_bucket(storage.bucket()).await {
        tracing::warn!(endpoint = %config.storage.endpoint_url(), "Object storage unavailable; continuing with local files only");
    }

    let assets = Arc::new(AssetStore::new(&config.upload_dir, &config.output_dir));
    assets.prepare().await.context("creating upload/output directories")?;

    let advisor = Arc::new(ColorAdvisor::new(client.clone()));
    let picker = Arc::new(ColorPicker::new(default_palette(), config.color_seed));
    let generator = Arc::new(AdGenerator::new(advisor.clone(), picker, client, assets.clone(), storage.clone()));

    let state = AppState {
        assets,
        advisor,
        generator,
        storage,
        jobs: Arc::new(JobRegistry::new()),
        generation_timeout: config.generation_timeout,
    };
    let app = router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
