mod config;
mod error;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use config::Config;
use handlers::ClassificationHandler;
use models::WasteCategory;
use server::create_router;
use services::{AiGatewayClient, VisionModel};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the logger so RUST_LOG can come from it
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting Waste Classifier...");

    let config = Config::from_env();

    let gateway = Arc::new(AiGatewayClient::from_config(&config));
    log::info!("✅ AI gateway client initialized with model: {}", gateway.model());
    log::info!("♻️ Categories: {}", WasteCategory::label_list());

    let handler = Arc::new(ClassificationHandler::new(gateway as Arc<dyn VisionModel>));
    let app = create_router(handler, config.max_image_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    log::info!("🌐 Server listening on {}", config.bind_addr);
    log::info!("📏 Max image size: {} bytes", config.max_image_bytes);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("🛑 Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
}
