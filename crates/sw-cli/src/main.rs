//! Slidewall CLI
//!
//! Operator front door for the fleet: list devices, send commands, manage
//! assignments and the default presentation, and watch live status.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slidewall::client::AdminClient;
use slidewall::commands;

#[derive(Parser)]
#[command(name = "slidewall")]
#[command(author, version, about = "Slidewall fleet operator CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Coordinator base URL
    #[arg(short = 'u', long, env = "SLIDEWALL_URL", default_value = "http://localhost:8787")]
    url: String,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List devices with derived presence
    /// Alias: list
    #[command(alias = "list")]
    Devices,

    /// Send a command to a device
    Send {
        /// Device identifier
        device: String,
        /// Command kind (play, pause, stop, restart, next_slide,
        /// prev_slide, goto_slide, assign_presentation, reboot, update_app)
        kind: String,
        /// Slide index for goto_slide
        #[arg(long)]
        slide: Option<usize>,
        /// Presentation ID for assign_presentation
        #[arg(long)]
        presentation: Option<u64>,
    },

    /// Assign a presentation to a device (auto-play + loop)
    Assign {
        /// Device identifier
        device: String,
        /// Presentation ID
        presentation: u64,
    },

    /// Clear a device's assignment
    Unassign {
        /// Device identifier
        device: String,
    },

    /// Set the fleet default presentation
    Default {
        /// Presentation ID; omit to clear
        presentation: Option<u64>,
    },

    /// Inspect or upload catalog presentations
    Presentation {
        #[command(subcommand)]
        action: PresentationAction,
    },

    /// Stream live device status from the push relay
    Watch,
}

#[derive(Subcommand)]
enum PresentationAction {
    /// Show a catalog entry
    Show { id: u64 },
    /// Upload a TOML deck file
    Put { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let client = AdminClient::new(&cli.url)?;

    match cli.command {
        Commands::Devices => {
            commands::devices_command(&client).await?;
        }
        Commands::Send { device, kind, slide, presentation } => {
            commands::send_command(&client, &device, &kind, slide, presentation).await?;
        }
        Commands::Assign { device, presentation } => {
            commands::assign_command(&client, &device, presentation).await?;
        }
        Commands::Unassign { device } => {
            commands::unassign_command(&client, &device).await?;
        }
        Commands::Default { presentation } => {
            commands::default_command(&client, presentation).await?;
        }
        Commands::Presentation { action } => match action {
            PresentationAction::Show { id } => {
                commands::presentation_show_command(&client, id).await?;
            }
            PresentationAction::Put { file } => {
                commands::presentation_put_command(&client, &file).await?;
            }
        },
        Commands::Watch => {
            commands::watch_command(&client).await?;
        }
    }

    Ok(())
}
