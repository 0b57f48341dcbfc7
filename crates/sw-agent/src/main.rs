//! Slidewall Agent Daemon
//!
//! Runs unattended on a kiosk. All services - presence reporting, command
//! routing, the push socket, assignment resolution, and the playback
//! engine - are cooperative tasks multiplexed on one current-thread
//! runtime; nothing here is truly parallel, and every timer has exactly
//! one owner.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sw_agent::api::CoordinatorClient;
use sw_agent::commands::CommandRouter;
use sw_agent::playback::{self, HttpSlideLoader, PlaybackStatus, PresentationSource, SlideLoader};
use sw_agent::presence::PresenceReporter;
use sw_agent::push::PushChannel;
use sw_agent::resolver::AssignmentResolver;
use sw_core::config::{self, AgentConfig};

#[derive(Parser)]
#[command(name = "sw-agent")]
#[command(about = "Slidewall kiosk agent")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Coordinator base URL (overrides config)
    #[arg(short = 'u', long)]
    coordinator: Option<String>,

    /// Device ID (overrides config; defaults to the hostname)
    #[arg(short, long)]
    device_id: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Slidewall Agent starting...");

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_agent_config_path);
    let mut config = if config_path.exists() {
        config::load_config(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", config_path, e);
            AgentConfig::default()
        })
    } else {
        AgentConfig::default()
    };

    // Apply command-line overrides
    if let Some(coordinator) = args.coordinator {
        config.coordinator_url = coordinator;
    }
    if let Some(device_id) = args.device_id {
        config.device_id = Some(device_id);
    }

    let config = Arc::new(config);
    tracing::info!(
        "Device {} reporting to {}",
        config.effective_device_id(),
        config.coordinator_url
    );

    let client = Arc::new(
        CoordinatorClient::new(&config.coordinator_url, config.tuning.request_timeout)
            .context("Failed to create coordinator client")?,
    );
    let loader: Arc<dyn SlideLoader> = Arc::new(
        HttpSlideLoader::new(&config.coordinator_url, config.tuning.request_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create slide loader: {}", e))?,
    );
    let source: Arc<dyn PresentationSource> = Arc::clone(&client) as Arc<dyn PresentationSource>;

    // Channels shared across the services
    let (status_tx, status_rx) = watch::channel(PlaybackStatus::default());
    let (health_tx, health_rx) = watch::channel(false);
    let (router_tx, router_rx) = mpsc::unbounded_channel();
    let (resolver_signal_tx, resolver_signal_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = mpsc::unbounded_channel();

    // Playback engine
    let (player, engine_handle) = playback::spawn(
        config.tuning.clone(),
        source,
        loader,
        status_tx,
        resolver_signal_tx.clone(),
    );

    // Command router: one executor for both delivery channels
    let router = CommandRouter::new(
        Arc::clone(&config),
        Arc::clone(&client),
        player.clone(),
        resolver_signal_tx,
        result_tx,
    );
    tokio::spawn(router.run(router_rx));

    let cancel = CancellationToken::new();

    // Presence reporter (heartbeat + command pull)
    let reporter = PresenceReporter::new(
        Arc::clone(&config),
        Arc::clone(&client),
        status_rx.clone(),
        router_tx.clone(),
        health_tx,
    );
    tokio::spawn(reporter.run(cancel.clone()));

    // Assignment resolver (assignment + default polls)
    let (resolver, resolver_event_rx) =
        AssignmentResolver::new(Arc::clone(&config), Arc::clone(&client), player.clone());
    tokio::spawn(resolver.run(
        resolver_event_rx,
        resolver_signal_rx,
        health_rx.clone(),
        status_rx,
        cancel.clone(),
    ));

    // Push socket (low-latency command delivery)
    let push = PushChannel::new(Arc::clone(&config), client.relay_url(), router_tx);
    tokio::spawn(push.run(result_rx, health_rx, cancel.clone()));

    // Wait for shutdown
    tokio::signal::ctrl_c().await.context("Signal handler failed")?;
    tracing::info!("Received Ctrl+C, shutting down...");
    cancel.cancel();
    player.shutdown();
    let _ = engine_handle.await;

    tracing::info!("Agent shutdown complete");
    Ok(())
}
