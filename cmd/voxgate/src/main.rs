//! voxgate - two-factor voice authentication from the command line.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    AuthenticateCommand, ConfigCommand, EnrollCommand, ExtractCommand, IdentifyCommand,
    ListCommand, RankCommand, RemoveCommand, VerifyCommand,
};

/// voxgate - two-factor voice authentication.
///
/// A recording is accepted when the voice matches an enrolled speaker
/// (GMM margin over a background model) and the spoken phrase matches that
/// speaker's enrolled passphrase (DTW template distance).
///
/// Configuration is read from ~/.voxgate/config.yaml and enrolled models are
/// kept in ~/.voxgate/models.redb unless configured otherwise.
#[derive(Parser)]
#[command(name = "voxgate")]
#[command(about = "Two-factor voice authentication")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.voxgate/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging (debug level)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enroll an identity from audio files
    Enroll(EnrollCommand),
    /// Name the speaker of a recording
    Identify(IdentifyCommand),
    /// Score a recording against a claimed identity with one engine
    Verify(VerifyCommand),
    /// Run full two-factor authentication on a recording
    Authenticate(AuthenticateCommand),
    /// Remove an enrolled identity
    Remove(RemoveCommand),
    /// List enrolled identities
    List(ListCommand),
    /// Export per-file feature statistics to CSV
    Extract(ExtractCommand),
    /// Rank feature statistics by speaker discriminability
    Rank(RankCommand),
    /// Show or initialize the configuration
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so results on stdout stay machine-readable.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Enroll(cmd) => cmd.run(&cli),
        Commands::Identify(cmd) => cmd.run(&cli),
        Commands::Verify(cmd) => cmd.run(&cli),
        Commands::Authenticate(cmd) => cmd.run(&cli),
        Commands::Remove(cmd) => cmd.run(&cli),
        Commands::List(cmd) => cmd.run(&cli),
        Commands::Extract(cmd) => cmd.run(&cli),
        Commands::Rank(cmd) => cmd.run(&cli),
        Commands::Config(cmd) => cmd.run(&cli),
    }
}
