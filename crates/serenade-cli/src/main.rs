//! Serenade CLI - Headless background music tooling
//!
//! Features:
//! - Media reference resolution
//! - Site configuration inspection
//! - Full lifecycle simulation against a fake player platform

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod output;
mod sim;

/// Serenade CLI - Background music toolkit
#[derive(Parser)]
#[command(name = "serenade-cli")]
#[command(version)]
#[command(about = "Resolve, inspect and simulate microsite background music", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve media references to canonical ids
    Resolve {
        /// Ids or watch/short/embed/shorts URLs
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Inspect the music settings of a site configuration file
    Inspect {
        /// Site configuration (JSON)
        file: PathBuf,

        /// Controller options (JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,
    },

    /// Run the controller against a simulated platform
    Simulate {
        /// Media reference to play
        reference: String,

        /// Play once instead of looping
        #[arg(long)]
        no_loop: bool,

        /// Mount with music switched off
        #[arg(long)]
        disabled: bool,

        /// Time until the platform API signals readiness
        #[arg(long, default_value = "50")]
        load_delay_ms: u64,

        /// Length of the simulated track
        #[arg(long, default_value = "200")]
        track_ms: u64,

        /// Track endings to observe per mount when looping
        #[arg(short, long, default_value = "2")]
        loops: u32,

        /// Leave out the mount element
        #[arg(long)]
        missing_mount: bool,

        /// Extra unmount/mount cycles
        #[arg(short, long, default_value = "0")]
        remounts: u32,

        /// Press play/pause this many times per mount
        #[arg(short, long, default_value = "0")]
        toggles: u32,

        /// Controller options (JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    serenade_core::init();

    match cli.command {
        Commands::Resolve { references } => {
            commands::resolve(&references, &cli.format)?;
        }
        Commands::Inspect { file, options } => {
            commands::inspect(&file, options, &cli.format)?;
        }
        Commands::Simulate {
            reference,
            no_loop,
            disabled,
            load_delay_ms,
            track_ms,
            loops,
            missing_mount,
            remounts,
            toggles,
            options,
        } => {
            let scenario = commands::Scenario {
                reference,
                enabled: !disabled,
                loop_playback: !no_loop,
                load_delay: Duration::from_millis(load_delay_ms),
                track: Duration::from_millis(track_ms),
                loops,
                missing_mount,
                remounts,
                toggles,
            };
            // Controller state is Rc-based, so the simulation stays on one thread
            let local = tokio::task::LocalSet::new();
            local
                .run_until(commands::simulate(scenario, options, &cli.format))
                .await?;
        }
    }

    Ok(())
}
