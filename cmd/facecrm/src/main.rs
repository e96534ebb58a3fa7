//! facecrm CLI - face-recognition contact manager.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, ContactsCommand, EnrollCommand, MatchCommand, ScanCommand};

/// facecrm - recognize and manage the people you meet.
///
/// Contacts are enrolled from a photo and the face embedding a model
/// recorded for it, then recognized again from recorded camera frames.
///
/// Configuration is stored in ~/.facecrm/facecrm/config.yaml; contacts and
/// photos live next to it under data/ unless `store.path` says otherwise.
#[derive(Parser)]
#[command(name = "facecrm")]
#[command(about = "Face-recognition contact manager")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.facecrm/facecrm/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// List, show and delete contacts
    Contacts(ContactsCommand),
    /// Enroll a new contact from a photo
    Enroll(EnrollCommand),
    /// Match a face embedding against enrolled contacts
    Match(MatchCommand),
    /// Run recognition over recorded camera frames
    Scan(ScanCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Contacts(cmd) => cmd.run(&cli).await,
        Commands::Enroll(cmd) => cmd.run(&cli).await,
        Commands::Match(cmd) => cmd.run(&cli).await,
        Commands::Scan(cmd) => cmd.run(&cli).await,
    }
}
