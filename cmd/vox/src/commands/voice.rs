//! Locale resolution and synthesis commands.

use clap::Args;
use flitevox_voices::{Locale, LocaleSupport};
use serde::Serialize;
use tracing::warn;

use super::{LocaleArgs, format_bytes, get_config, output, print_success, stdout};
use crate::Cli;

/// Show how well the configured voices cover a locale.
#[derive(Args)]
pub struct SupportCommand {
    #[command(flatten)]
    locale: LocaleArgs,
}

#[derive(Serialize)]
struct SupportResult {
    locale: Locale,
    support: LocaleSupport,
}

impl SupportCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let voices = cfg.build_voices();
        let locale = self.locale.locale();
        let support = voices.query_support(&locale);
        output(cli).write(&SupportResult { locale, support })
    }
}

/// Resolve a locale to a voice and print it.
#[derive(Args)]
pub struct ResolveCommand {
    #[command(flatten)]
    locale: LocaleArgs,
}

impl ResolveCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let mut voices = cfg.build_voices();
        let summary = voices.resolve(&self.locale.locale())?.summary();
        output(cli).write(&summary)
    }
}

/// Synthesize phonemes and write raw PCM.
///
/// The audio is written to the -o file; a summary is printed to stdout.
#[derive(Args)]
pub struct SpeakCommand {
    #[command(flatten)]
    locale: LocaleArgs,

    /// Space separated phonemes
    #[arg(short = 'p', long)]
    phonemes: String,

    /// Use the default voice when the locale cannot be resolved
    #[arg(long)]
    default: bool,
}

impl SpeakCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let mut voices = cfg.build_voices();
        let locale = self.locale.locale();

        let resolved = voices.resolve(&locale).map(|_| ());
        if let Err(e) = resolved {
            if !self.default {
                return Err(e.into());
            }
            warn!(error = %e, "using default voice");
            voices.set_default()?;
        }
        let voice = voices
            .current_mut()
            .ok_or_else(|| anyhow::anyhow!("no voice for '{}'", locale))?;
        let summary = voice.summary();
        let mut session = voice.into_session(cfg.voices.buffer_size)?;
        let speech = session.synthesize(&self.phonemes)?;

        if let Some(path) = cli.output.as_deref() {
            stdout(cli).write_binary(&speech.audio, path)?;
            print_success(&format!("Audio saved to {} ({})", path, format_bytes(speech.audio.len())));
        }

        let result = serde_json::json!({
            "locale": summary.locale,
            "resolved_locale": summary.resolved_locale,
            "kind": summary.kind,
            "sample_rate": session.sample_rate(),
            "bits_per_sample": session.bits_per_sample(),
            "channels": session.info().channels,
            "version": session.version(),
            "audio_size": speech.audio.len(),
            "duration": speech.duration,
            "output_file": cli.output,
        });
        stdout(cli).write(&result)
    }
}

/// List configured linked voices.
#[derive(Args)]
pub struct ListCommand {}

#[derive(Serialize)]
struct LinkedEntry {
    locale: Locale,
    library: std::path::PathBuf,
    registered: bool,
}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let voices = cfg.build_voices();

        let entries: Vec<LinkedEntry> = cfg
            .linked
            .iter()
            .zip(voices.linked_voices())
            .map(|(entry, voice)| LinkedEntry {
                locale: voice.locale().clone(),
                library: entry.library.clone(),
                registered: voice.is_registered(),
            })
            .collect();

        if entries.is_empty() {
            eprintln!("No linked voices configured");
        }
        output(cli).write(&serde_json::json!({
            "mode": voices.mode(),
            "capacity": voices.capacity(),
            "voxdir": cfg.voices.voxdir,
            "linked": entries,
        }))
    }
}
