use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use sidebands::{wav, Patch, Synth, SynthConfig};

fn parse_duration(s: &str) -> Result<Duration, std::num::ParseIntError> {
    let ms: u64 = s.parse()?;
    Ok(Duration::from_millis(ms))
}

/// Render notes with the Sidebands FM engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a single note to a WAV file
    Render {
        /// Output WAV path
        #[arg(long)]
        out: PathBuf,

        /// Engine configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Patch state written by `init-patch` or a host
        #[arg(long)]
        patch: Option<PathBuf>,

        /// Note number (69 = A4)
        #[arg(long, default_value_t = 69)]
        note: i32,

        /// Velocity, 0 to 1
        #[arg(long, default_value_t = 1.0)]
        velocity: f64,

        /// Key down time in milliseconds
        #[arg(long, default_value = "1000", value_parser = parse_duration)]
        hold_ms: Duration,

        /// Time rendered after key up, in milliseconds
        #[arg(long, default_value = "1000", value_parser = parse_duration)]
        release_ms: Duration,

        /// Scale the output so its peak sits at 0.5
        #[arg(long)]
        normalize: bool,
    },
    /// Write the default patch state
    InitPatch {
        /// Destination path
        path: PathBuf,
    },
    /// List every parameter id
    Params,
}

fn load_patch(path: &Path) -> Result<Patch> {
    let patch = Patch::new();
    let file = File::open(path).with_context(|| format!("Unable to open patch '{}'", path.display()))?;
    patch
        .load_state(&mut BufReader::new(file))
        .with_context(|| format!("Unable to load patch '{}'", path.display()))?;
    Ok(patch)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Render {
            out,
            config,
            patch,
            note,
            velocity,
            hold_ms,
            release_ms,
            normalize,
        } => {
            if !(0..=127).contains(&note) {
                return Err(anyhow!("Note must be within 0..=127 (got {})", note));
            }
            if !(0.0..=1.0).contains(&velocity) {
                return Err(anyhow!("Velocity must be within 0..=1 (got {})", velocity));
            }

            let config = match config {
                Some(path) => SynthConfig::load(&path)?,
                None => SynthConfig::default(),
            };
            let patch = match patch {
                Some(path) => load_patch(&path)?,
                None => Patch::new(),
            };

            let sample_rate = config.sample_rate;
            let mut synth = Synth::with_patch(config, patch.into())?;
            let mut samples = synth.render_note(
                note,
                velocity,
                hold_ms.as_secs_f64(),
                release_ms.as_secs_f64(),
            );
            if normalize {
                wav::normalize(&mut samples, 0.5);
            }

            wav::save_wav(&out, &samples, sample_rate.round() as u32)?;
            info!("Wrote {} samples to {}", samples.len(), out.display());
        }
        Commands::InitPatch { path } => {
            let file = File::create(&path)
                .with_context(|| format!("Unable to create '{}'", path.display()))?;
            Patch::new().save_state(&mut BufWriter::new(file))?;
            info!("Wrote default patch to {}", path.display());
        }
        Commands::Params => {
            let patch = Patch::new();
            for id in patch.parameter_ids() {
                if let Some(info) = patch.param_info(id) {
                    println!(
                        "{:#010x}  {:<24} {:>6} .. {:<6} default {}{}",
                        id.0,
                        id.to_string(),
                        info.min,
                        info.max,
                        info.default,
                        if info.discrete { " (discrete)" } else { "" }
                    );
                }
            }
        }
    }

    Ok(())
}
