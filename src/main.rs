use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use sensor_overlay::config::{AppConfig, MemorySettings};
use sensor_overlay::core::{ListenerReconciler, UpdateManager};
use sensor_overlay::displayers::{LoggingOverlayTarget, OverlayTextSink};
use sensor_overlay::sources::{DeviceConfig, SimulatedRegistry};
use sensor_overlay_core::Capability;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often simulated devices publish a new reading
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// sensor-overlay - keeps camera text overlays bound to live sensor readings
#[derive(Parser, Debug, Clone)]
#[command(name = "sensor-overlay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the default location
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reconciliation interval in milliseconds (overrides the config file)
    #[arg(short = 'i', long = "interval-ms", value_name = "MS")]
    interval_ms: Option<u64>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Run a single reconciliation pass, print the bindings and exit
    #[arg(long = "once")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    warn!("Starting sensor-overlay v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load config")?,
    };
    if config.overlay_ids.is_empty() {
        warn!("No overlay slots configured, nothing to bind");
    }

    let registry = Arc::new(SimulatedRegistry::from_configs(config.devices.clone()));
    let camera = registry.detached_device(DeviceConfig::new(
        config.camera_id.clone(),
        vec![Capability::ObjectDetector],
    ));
    let settings = Arc::new(MemorySettings::from_validated(&config.settings));
    let sink = Arc::new(OverlayTextSink::new(
        settings.clone(),
        Arc::new(LoggingOverlayTarget),
    ));

    let manager = Arc::new(UpdateManager::new(
        Arc::new(ListenerReconciler::new(
            camera,
            registry.clone(),
            settings,
            sink,
        )),
        config.overlay_ids.clone(),
    ));
    let reconciler = Arc::clone(manager.reconciler());

    if cli.once {
        let report = reconciler.start(manager.overlay_ids()).await;
        reconciler.drain_events().await;
        for binding in reconciler.bindings().await {
            println!(
                "{}\t{}\t{}",
                binding.overlay_id, binding.kind, binding.device_id
            );
        }
        for (overlay_id, reason) in &report.failed {
            eprintln!("{}\tfailed\t{}", overlay_id, reason);
        }
        reconciler.shutdown().await;
        return Ok(());
    }

    let interval = cli
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.update_interval());
    info!("Reconciling every {:?}", interval);

    let events = tokio::spawn(Arc::clone(&reconciler).run_events());

    let runner = Arc::clone(&manager);
    let updates = tokio::spawn(async move { runner.run(interval).await });

    let ticker_registry = Arc::clone(&registry);
    let ticker = tokio::spawn(async move {
        let started = Instant::now();
        let mut ticks = tokio::time::interval(TICK_INTERVAL);
        loop {
            ticks.tick().await;
            for device in ticker_registry.all_devices() {
                device.tick(started.elapsed());
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    updates.abort();
    ticker.abort();
    reconciler.shutdown().await;
    events.abort();

    Ok(())
}
