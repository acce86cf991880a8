// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use skipq_detector::{
    api::{create_app, start_server, AppState},
    config::ServerConfig,
    detection::{ModelResolver, OnnxModelLoader},
    version,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();
    let addr = config.listen_addr()?;

    println!("🚀 Starting SkipQ Detector...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();
    tracing::info!("{}", version::get_version_string());

    println!("🧠 Resolving detection model...");
    let resolver = ModelResolver::new(
        config.resolver_config(),
        OnnxModelLoader::new(config.yolo_options()),
    );
    // Session creation is blocking and can take a while for large models
    let model = tokio::task::spawn_blocking(move || resolver.resolve())
        .await
        .context("Model resolution task panicked")?
        .context("No detection model could be loaded")?;

    println!(
        "✅ Detection engine: {} ({} classes){}",
        model.source.display(),
        model.detector.class_count(),
        if model.is_fallback { " [fallback]" } else { "" }
    );

    let app = create_app(AppState::new(model), config.max_upload_bytes);

    println!("🌐 Server running on http://{}", addr);
    println!("   POST /detect   (multipart field 'image')");
    println!("   GET  /health");
    println!();

    start_server(addr, app).await?;

    println!("👋 SkipQ Detector stopped");
    Ok(())
}
