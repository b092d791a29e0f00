mod app;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
};

use tienda_core::{
    config::{self, AppConfig},
    CartSlot, CatalogLoader, CatalogSource, CheckoutGateway, HttpCheckout, Storefront,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    tracing::info!(
        catalog = %config.catalog_source,
        data_root = %config.data_root.display(),
        "Starting tienda"
    );

    let store = Storefront::open(CartSlot::new(&config.data_root));
    let loader = CatalogLoader::new(CatalogSource::parse(&config.catalog_source));
    let gateway: Arc<dyn CheckoutGateway> = Arc::new(HttpCheckout::new(config.checkout_url));

    let mut app = app::TiendaApp::new(store, loader, gateway, config.notice_secs);
    app.run().await
}

/// The terminal owns stdout, so logs only go to `logs/tienda.log`.
fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("tienda.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
