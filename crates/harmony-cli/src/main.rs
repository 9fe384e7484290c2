//! harmony - key, chord and progression suggestions for transcribed notes
//!
//! Subcommands:
//! - `harmony analyze <notes.json>` - Run the pipeline and print the snapshot
//! - `harmony config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harmony_understand::{ConfigSources, HarmonyConfig, HarmonyEngine};
use tracing::info;

mod input;

#[derive(Parser)]
#[command(name = "harmony")]
#[command(about = "Key, chord and progression suggestions for transcribed notes")]
#[command(version)]
struct Cli {
    /// Config file replacing ./harmony.toml
    #[arg(short, long, global = true, env = "HARMONY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSON note file
    Analyze {
        /// Notes as a JSON array, or an object with a "notes" array
        notes: PathBuf,

        /// WAV recording used to align note starts to detected onsets
        #[arg(short, long)]
        audio: Option<PathBuf>,

        /// Key candidate to use instead of the best one (e.g. "E-minor")
        #[arg(short, long)]
        key: Option<String>,

        /// Progression weirdness, 0 (conventional) to 1 (colorful)
        #[arg(short, long)]
        weirdness: Option<f64>,

        /// Print a short text summary instead of JSON
        #[arg(short, long)]
        summary: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = HarmonyConfig::load_with_sources_from(cli.config.as_deref())
        .context("loading configuration")?;
    init_tracing(&config);
    log_sources(&sources);

    match cli.command {
        Commands::Analyze {
            notes,
            audio,
            key,
            weirdness,
            summary,
        } => {
            let notes = input::read_notes(&notes)?;
            let engine = HarmonyEngine::new(config);

            let mut snapshot = match audio {
                Some(path) => {
                    let audio = input::read_wav(&path)?;
                    engine.analyze_with_audio(&notes, &audio)
                }
                None => engine.analyze(&notes),
            };
            if let Some(id) = key {
                snapshot = engine.select_key(&snapshot, &id)?;
            }
            if let Some(w) = weirdness {
                snapshot = engine.with_weirdness(&snapshot, w);
            }

            if summary {
                print!("{}", snapshot.summary());
            } else {
                println!("{}", snapshot.to_json()?);
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays machine-readable.
fn init_tracing(config: &HarmonyConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn log_sources(sources: &ConfigSources) {
    for file in &sources.files {
        info!(path = %file.display(), "loaded config file");
    }
    if !sources.env_overrides.is_empty() {
        info!(vars = ?sources.env_overrides, "environment overrides applied");
    }
}
