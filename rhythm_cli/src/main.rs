use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::LevelFilter;

mod simulate;

#[derive(Debug, Parser)]
#[command(name = "rhythm")]
#[command(about = "Beatmap inspector and headless play simulator", long_about = None)]
struct Cli {
    /// Log gameplay progress (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a beatmap and print a summary with any warnings.
    Inspect {
        beatmap: PathBuf,
        /// Dump the parsed beatmap as JSON instead.
        #[arg(long)]
        json: bool,
    },
    /// Play a beatmap without audio or display and print the result.
    Simulate {
        beatmap: PathBuf,
        /// TOML file with session settings.
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Scripted presses, one `<time_ms>,<lane>` per line.
        #[arg(short, long, conflicts_with = "autoplay")]
        inputs: Option<PathBuf>,
        /// Press every note on time.
        #[arg(long)]
        autoplay: bool,
        /// Shifts autoplay presses by this many milliseconds (negative is early).
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset_ms: i32,
        /// Simulated frames per second.
        #[arg(long, default_value_t = 240, value_parser = clap::value_parser!(u32).range(1..))]
        fps: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Inspect { beatmap, json } => inspect(&beatmap, json)?,
        Command::Simulate {
            beatmap,
            settings,
            inputs,
            autoplay,
            offset_ms,
            fps,
        } => {
            let options = simulate::Options {
                settings,
                inputs,
                autoplay,
                offset_ms,
                fps,
            };
            simulate::run_simulation(&beatmap, &options)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(LevelFilter::Info);
    }
    let _ = builder.format_timestamp(None).try_init();
}

fn inspect(path: &Path, json: bool) -> anyhow::Result<()> {
    let report = beatmap_parser::load_with_report(path)
        .with_context(|| format!("inspect failed: {}", path.display()))?;
    let beatmap = &report.beatmap;

    if json {
        let out = serde_json::to_string_pretty(beatmap).context("failed to serialize beatmap")?;
        println!("{out}");
        return Ok(());
    }

    let meta = beatmap.metadata();
    println!("{beatmap}");
    println!("Creator: {}", meta.creator);
    println!("Audio: {}", beatmap.general().audio_filename);
    println!("Keys: {}", beatmap.key_count());
    println!(
        "Notes: {} ({} long)",
        beatmap.note_count(),
        beatmap.long_note_count()
    );
    if let Some(last) = beatmap.last_note_time() {
        println!("Last note: {last}ms");
    }
    match beatmap.bpm_range() {
        Some((lo, hi)) if (hi - lo).abs() < 1e-6 => println!("BPM: {lo:.1}"),
        Some((lo, hi)) => println!("BPM: {lo:.1}-{hi:.1}"),
        None => println!("BPM: -"),
    }
    println!("Timing points: {}", beatmap.timing_points().len());

    println!("Warnings: {}", report.warnings.len());
    for warning in &report.warnings {
        println!("  {warning}");
    }

    Ok(())
}
