//! vox - A command line interface for flitevox voices.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, InfoCommand, ListCommand, ResolveCommand, SpeakCommand, SupportCommand};

/// vox - A command line interface for flitevox voices.
///
/// This tool resolves locales against the configured voices and drives
/// voice plugins:
///   - Locale support queries and resolution
///   - Phoneme synthesis to raw PCM
///   - Voice plugin inspection
///
/// Configuration is stored in ~/.flitevox/vox/config.yaml
#[derive(Parser)]
#[command(name = "vox")]
#[command(about = "flitevox voice CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.flitevox/vox/config.yaml)
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
    /// Show how well a locale is supported
    Support(SupportCommand),
    /// Resolve a locale to a voice
    Resolve(ResolveCommand),
    /// Synthesize phonemes with the voice for a locale
    Speak(SpeakCommand),
    /// Inspect a voice plugin
    Info(InfoCommand),
    /// List configured linked voices
    List(ListCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli),
        Commands::Support(cmd) => cmd.run(&cli),
        Commands::Resolve(cmd) => cmd.run(&cli),
        Commands::Speak(cmd) => cmd.run(&cli),
        Commands::Info(cmd) => cmd.run(&cli),
        Commands::List(cmd) => cmd.run(&cli),
    }
}
