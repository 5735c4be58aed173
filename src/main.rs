use anyhow::Context as _;
use clap::Parser;
use dotenvy::dotenv;
use std::process;
use tracing_subscriber::EnvFilter;

mod audio;
mod config;
mod model;
mod progress;
mod transcription;

use audio::FfprobeProbe;
use config::{Cli, Config};
use model::WhisperLoader;

fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from(Cli::parse());

    if let Err(e) = run(&config) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let summary = transcription::transcribe(config, &WhisperLoader, &FfprobeProbe::from_env())
        .with_context(|| format!("Failed to transcribe {}", config.input_path.display()))?;

    let audio_note = summary
        .audio_duration_secs
        .map(|secs| format!(" from {} of audio", audio::format_duration(secs)))
        .unwrap_or_default();
    println!(
        "Done. Wrote transcript to: {} ({} lines{}, {:.1}s)",
        summary.output_path.display(),
        summary.lines,
        audio_note,
        summary.elapsed.as_secs_f32()
    );
    Ok(())
}
