mod app;

use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::warn;
use tracing_subscriber::{prelude::*, EnvFilter};
use vehicle_registry_core::{
    config::{self, AppConfig},
    VehicleRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let created_config = config::ensure_default_config();
    let config = AppConfig::load()?;
    init_logging(&config.log_dir)?;
    if let Err(err) = created_config {
        warn!(?err, "could not write default config file");
    }

    let registry = VehicleRegistry::open(&config.data_file).with_context(|| {
        format!(
            "refusing to start: could not load vehicles from {}",
            config.data_file.display()
        )
    })?;

    let input = BufReader::new(tokio::io::stdin());
    let mut app = app::ConsoleApp::new(registry, input, io::stdout());
    app.run().await
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("vehicles.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the prompt, so logs only go to the file
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
