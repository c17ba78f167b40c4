//! Utility functions for CLI commands.

use clap::Args;
use flitevox_cli::{Config, Output, OutputFormat, load_config};
use flitevox_voices::Locale;

use crate::Cli;

pub const APP_NAME: &str = "vox";

/// A locale given as positional arguments.
#[derive(Args, Debug, Clone)]
pub struct LocaleArgs {
    /// Language, e.g. eng
    pub language: String,
    /// Country, e.g. USA
    #[arg(default_value = "")]
    pub country: String,
    /// Variant, e.g. male,rms
    #[arg(default_value = "")]
    pub variant: String,
}

impl LocaleArgs {
    pub fn locale(&self) -> Locale {
        Locale::new(self.language.as_str(), self.country.as_str(), self.variant.as_str())
    }
}

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Output for structured results, honoring `--json` and `-o`.
pub fn output(cli: &Cli) -> Output {
    Output::new(format(cli), cli.output.clone())
}

/// Output for structured results that always goes to stdout.
pub fn stdout(cli: &Cli) -> Output {
    Output::new(format(cli), None)
}

fn format(cli: &Cli) -> OutputFormat {
    if cli.json { OutputFormat::Json } else { OutputFormat::Yaml }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Formats bytes to human readable string.
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
