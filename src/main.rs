// src/main.rs
use crate::audio::process::ProcessPlayer;
use crate::config::AppConfig;
use crate::connectors::backend::LocalBackend;
use crate::core::orchestrator::{Orchestrator, Services};
use crate::strategies::sma_reversion::SmaReversion;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod audio;
mod config;
mod connectors;
mod core;
mod error;
mod strategies;
#[cfg(test)]
mod testing;
mod tui;
mod types;

/// Logs go to a daily file so they never draw over the console.
fn init_logging(log_dir: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "market_narrator.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new()?;
    let _log_guard = init_logging(&config.log_dir);

    println!("========================================");
    println!("     MARKET NARRATOR - v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("Target:  {}", config.symbol);
    println!("Backend: {}", config.base_url);
    println!("========================================");

    info!(
        "Starting for {} against {} (volume {})",
        config.symbol, config.base_url, config.trade_volume
    );

    // 2. Initialize Components
    let backend = Arc::new(LocalBackend::new(
        &config.base_url,
        config.timing.request_timeout(),
    )?);
    let services = Services {
        market: backend.clone(),
        commentary: backend.clone(),
        execution: backend,
        player: Arc::new(ProcessPlayer::new(&config.audio)),
    };

    // 3. Create Channels
    let (ui_tx, ui_rx) = mpsc::channel(100);

    // 4. Run loops behind the console
    let mut orchestrator = Orchestrator::new(config, services, ui_tx);
    orchestrator.start(SmaReversion);

    let result = tui::run(ui_rx, &mut orchestrator).await;

    orchestrator.shutdown();
    info!("Shut down");

    if let Err(e) = result {
        eprintln!("Console error: {}", e);
        return Err(e);
    }
    Ok(())
}
