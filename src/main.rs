use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use hubkeeper::engine::Event;
use hubkeeper::settings::Settings;

mod cmd;

#[derive(Parser)]
#[command(name = "hubkeeper")]
#[command(version, about = "Convergence controller for a managed JupyterHub service")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for durable reconciler state (flags, announcements, status)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// The managed service's runtime directory
    #[arg(long, global = true)]
    pub runtime_dir: Option<PathBuf>,

    /// Directory holding the rendered configuration file
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Operator configuration file. Defaults to <state-dir>/operator.json
    #[arg(long, global = true)]
    pub operator_config: Option<PathBuf>,

    /// Optional JSON file overriding external commands and the unit path
    #[arg(long, global = true)]
    pub settings_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one reconciliation pass for an external event
    Dispatch {
        event: EventKind,

        /// Announcement file for the *-joined events
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Show the last published status
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EventKind {
    ConfigChanged,
    AuthenticatorJoined,
    AuthenticatorDeparted,
    SpawnerJoined,
    SpawnerDeparted,
    Update,
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::ConfigChanged => Event::ConfigChanged,
            EventKind::AuthenticatorJoined => Event::AuthenticatorJoined,
            EventKind::AuthenticatorDeparted => Event::AuthenticatorDeparted,
            EventKind::SpawnerJoined => Event::SpawnerJoined,
            EventKind::SpawnerDeparted => Event::SpawnerDeparted,
            EventKind::Update => Event::Update,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new(
        cli.state_dir,
        cli.runtime_dir,
        cli.config_dir,
        cli.operator_config,
        cli.settings_file.as_deref(),
    )?;
    settings.ensure_directories()?;

    match cli.command {
        Commands::Dispatch { event, data } => {
            cmd::cmd_dispatch(&settings, event.into(), data.as_deref())?;
        }
        Commands::Status => cmd::cmd_status(&settings)?,
    }

    Ok(())
}
