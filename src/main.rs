//! Helios sensor node for Raspberry Pi
//!
//! A Rust-based server that:
//! - Drives an indicator LED and samples a light-dependent resistor
//! - Serves a dashboard, a small JSON API and a live SSE light feed
//! - Blinks the LED in the background
//! - Runs as a systemd service with graceful shutdown

mod config;
mod device;
mod scheduler;
mod web;

use clap::Parser;
use config::Config;
use device::{DeviceHandle, DeviceState, Hardware, RpiHardware, SimulatedHardware};
use scheduler::Scheduler;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web::WebServer;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "helios-node")]
#[command(about = "LED and light sensor node for Raspberry Pi")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Use simulated hardware instead of GPIO/SPI
    #[arg(long)]
    simulate: bool,

    /// Blink the LED a few times and exit
    #[arg(long)]
    blink_test: bool,
}

/// Using current_thread runtime for single-core Pi Zero W
/// Every task shares one thread and switches only at `.await` points
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration; its verbose flag also selects the log level
    let loaded = Config::load(&args.config);

    // Initialize logging
    init_logging(args.verbose || loaded.as_ref().is_ok_and(|c| c.verbose));

    tracing::info!("Starting Helios node");

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {}: {}", args.config, e);
        tracing::info!("Using default configuration");
        Config::default()
    });

    // Initialize hardware; losing it at startup is fatal
    let hardware: Box<dyn Hardware> = if args.simulate {
        tracing::info!("Using simulated hardware");
        Box::new(SimulatedHardware::sweeping(655))
    } else {
        Box::new(RpiHardware::new(&config)?)
    };
    let device = DeviceHandle::new(DeviceState::new(hardware));

    let scheduler = Scheduler::new(device.clone(), config.blink_interval());

    // Handle one-shot commands
    if args.blink_test {
        tracing::info!("Running blink test...");
        scheduler.blink_times(4).await;
        tracing::info!("Blink test complete");
        return Ok(());
    }

    // Setup shutdown signal handling
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Create web server
    let listener = WebServer::bind(config::LISTEN_ADDR).await?;
    let web_server = Arc::new(WebServer::new(&config, device.clone()));

    // Spawn blink task
    let scheduler_shutdown = shutdown_tx.subscribe();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    // Spawn web server task
    let web_shutdown = shutdown_tx.subscribe();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.run_with_shutdown(listener, web_shutdown).await {
            tracing::error!("Web server error: {}", e);
        }
    });

    // Wait for shutdown signal
    wait_for_shutdown().await?;
    tracing::info!("Shutdown signal received");

    // Send shutdown to all tasks, open event streams included
    let _ = shutdown_tx.send(());

    // Wait for tasks to complete with timeout
    tokio::select! {
        _ = scheduler_handle => {},
        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
            tracing::warn!("Scheduler shutdown timeout");
        }
    }

    tokio::select! {
        _ = web_handle => {},
        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
            tracing::warn!("Web server shutdown timeout");
        }
    }

    device.set_led(false);
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
///
/// Default level is "warn" to minimize SD card wear from log writes.
/// Use --verbose flag for "debug" level during development/troubleshooting.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("helios_node={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }

    Ok(())
}
