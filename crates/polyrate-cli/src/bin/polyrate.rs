//! polyrate - sample-rate conversion for WAV files
//!
//! Usage:
//!   polyrate rational <in.wav> <out.wav> --to-rate 48000
//!   polyrate rational <in.wav> <out.wav> --up 3 --down 2
//!   polyrate fractional <in.wav> <out.wav> --ratio 1.0001
//!   polyrate filter <in.wav> <out.wav> --cutoff 0.25
//!   polyrate design --up 160 --down 147

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polyrate_cli::output::{print_json, RunReport};
use polyrate_cli::pipeline::{convolve_audio, resample_audio};
use polyrate_cli::wav::{read_wav, write_wav, AudioData};
use polyrate_core::{
    design_for_ratio, design_lowpass, FractionalResampler, PolyphaseBank, Ratio,
    RationalResampler, ResamplerConfig,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "polyrate")]
#[command(about = "Polyphase sample-rate conversion for WAV files", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Frames per process call (overrides config)
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resample by an exact rational ratio
    Rational {
        input: PathBuf,
        output: PathBuf,

        /// Target sample rate in Hz
        #[arg(long, conflicts_with_all = ["up", "down"], required_unless_present = "up")]
        to_rate: Option<u32>,

        /// Up-sampling factor L
        #[arg(long, requires = "down")]
        up: Option<i64>,

        /// Down-sampling factor M
        #[arg(long, requires = "up")]
        down: Option<i64>,
    },

    /// Resample by an arbitrary floating ratio (output rate / input rate)
    Fractional {
        input: PathBuf,
        output: PathBuf,

        #[arg(long)]
        ratio: f64,

        /// Polyphase branches (overrides config)
        #[arg(long)]
        phases: Option<u32>,
    },

    /// Low-pass filter without changing the rate
    Filter {
        input: PathBuf,
        output: PathBuf,

        /// Stopband edge relative to Nyquist, in (0, 1]
        #[arg(long)]
        cutoff: f64,
    },

    /// Print the anti-aliasing filter designed for a ratio
    Design {
        #[arg(long)]
        up: i64,

        #[arg(long)]
        down: i64,

        /// Include the coefficients in the output
        #[arg(long)]
        coefficients: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (clean JSON output for parsing)
    // Verbose: show Info level logs for debugging
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    let mut config = match &args.config {
        Some(path) => ResamplerConfig::load(path)?,
        None => ResamplerConfig::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        config.stream.chunk_size = chunk_size;
    }
    config.validate()?;

    match args.command {
        Command::Rational {
            input,
            output,
            to_rate,
            up,
            down,
        } => run_rational(&input, &output, to_rate, up.zip(down), &config),
        Command::Fractional {
            input,
            output,
            ratio,
            phases,
        } => {
            if let Some(phases) = phases {
                config.fractional.phases = phases;
            }
            config.validate()?;
            run_fractional(&input, &output, ratio, &config)
        }
        Command::Filter {
            input,
            output,
            cutoff,
        } => run_filter(&input, &output, cutoff, &config),
        Command::Design {
            up,
            down,
            coefficients,
        } => run_design(up, down, coefficients, &config),
    }
}

fn load_input(input_path: &Path) -> Result<AudioData> {
    if !input_path.exists() {
        anyhow::bail!("Input file not found: {}", input_path.display());
    }

    log::info!("Processing: {}", input_path.display());
    let audio = read_wav(input_path)?;
    log::info!(
        "Decoded audio: {:.1}s duration, {} frames x {} channels @ {}Hz",
        audio.duration_ms() as f64 / 1000.0,
        audio.frames(),
        audio.channels,
        audio.sample_rate
    );
    Ok(audio)
}

fn run_rational(
    input_path: &Path,
    output_path: &Path,
    to_rate: Option<u32>,
    factors: Option<(i64, i64)>,
    config: &ResamplerConfig,
) -> Result<()> {
    let audio = load_input(input_path)?;

    let ratio = match (to_rate, factors) {
        (Some(rate), _) => Ratio::from_rates(audio.sample_rate, rate)?,
        (None, Some((up, down))) => Ratio::new(up, down)?,
        (None, None) => anyhow::bail!("Either --to-rate or --up/--down is required"),
    };

    let scaled = audio.sample_rate as u64 * ratio.up() as u64;
    if scaled % ratio.down() as u64 != 0 {
        anyhow::bail!(
            "Ratio {} turns {}Hz into a fractional rate",
            ratio,
            audio.sample_rate
        );
    }
    let output_rate = u32::try_from(scaled / ratio.down() as u64)
        .with_context(|| format!("Output rate for ratio {} is out of range", ratio))?;

    let start = Instant::now();
    let resampler = RationalResampler::<f32>::from_ratio(ratio, &config.quality)?;
    log::info!(
        "Ratio {}: {} taps, {} per phase",
        ratio,
        resampler.filter_len(),
        resampler.bank().taps_per_phase()
    );

    let filter_taps = resampler.filter_len();
    let latency = resampler.latency();
    let (resampled, stats) =
        resample_audio(resampler, &audio, config.stream.chunk_size, output_rate)?;
    write_wav(output_path, &resampled)?;

    let report = RunReport {
        status: "success".to_string(),
        mode: "rational".to_string(),
        input_file: input_path.display().to_string(),
        output_file: output_path.display().to_string(),
        input_rate: audio.sample_rate,
        output_rate,
        channels: audio.channels,
        frames_in: 0,
        frames_out: 0,
        ratio: Some(ratio.to_string()),
        filter_taps: Some(filter_taps),
        latency_samples: Some(latency),
        chunks: None,
        tail_frames: None,
        processing_time_seconds: start.elapsed().as_secs_f64(),
    }
    .with_stats(&stats);

    log::info!(
        "Wrote {} frames in {:.2}s",
        report.frames_out,
        report.processing_time_seconds
    );
    print_json(&report);
    Ok(())
}

fn run_fractional(
    input_path: &Path,
    output_path: &Path,
    ratio: f64,
    config: &ResamplerConfig,
) -> Result<()> {
    let audio = load_input(input_path)?;
    let output_rate = (audio.sample_rate as f64 * ratio).round();
    if !(output_rate >= 1.0 && output_rate <= u32::MAX as f64) {
        anyhow::bail!("Ratio {} gives an unusable output rate {}", ratio, output_rate);
    }
    let output_rate = output_rate as u32;

    let start = Instant::now();
    let resampler =
        FractionalResampler::<f32>::new(ratio, config.fractional.phases, &config.quality)?;
    log::info!(
        "Ratio {:.6} with {} phases, {} taps",
        ratio,
        resampler.phases(),
        resampler.bank().prototype_len()
    );

    let filter_taps = resampler.bank().prototype_len();
    let latency = resampler.latency();
    let (resampled, stats) =
        resample_audio(resampler, &audio, config.stream.chunk_size, output_rate)?;
    write_wav(output_path, &resampled)?;

    let report = RunReport {
        status: "success".to_string(),
        mode: "fractional".to_string(),
        input_file: input_path.display().to_string(),
        output_file: output_path.display().to_string(),
        input_rate: audio.sample_rate,
        output_rate,
        channels: audio.channels,
        frames_in: 0,
        frames_out: 0,
        ratio: Some(format!("{}", ratio)),
        filter_taps: Some(filter_taps),
        latency_samples: Some(latency),
        chunks: None,
        tail_frames: None,
        processing_time_seconds: start.elapsed().as_secs_f64(),
    }
    .with_stats(&stats);

    print_json(&report);
    Ok(())
}

fn run_filter(
    input_path: &Path,
    output_path: &Path,
    cutoff: f64,
    config: &ResamplerConfig,
) -> Result<()> {
    let audio = load_input(input_path)?;

    let start = Instant::now();
    let design = design_lowpass(cutoff, 1, &config.quality)?;
    log::info!("Low-pass at {:.4} of Nyquist: {} taps", cutoff, design.len());

    let filtered = convolve_audio(&design.taps, &audio, config.stream.chunk_size)?;
    write_wav(output_path, &filtered)?;

    let report = RunReport {
        status: "success".to_string(),
        mode: "filter".to_string(),
        input_file: input_path.display().to_string(),
        output_file: output_path.display().to_string(),
        input_rate: audio.sample_rate,
        output_rate: audio.sample_rate,
        channels: audio.channels,
        frames_in: audio.frames(),
        frames_out: filtered.frames(),
        ratio: None,
        filter_taps: Some(design.len()),
        latency_samples: Some(design.group_delay()),
        chunks: None,
        tail_frames: Some(design.len() - 1),
        processing_time_seconds: start.elapsed().as_secs_f64(),
    };

    print_json(&report);
    Ok(())
}

fn run_design(up: i64, down: i64, coefficients: bool, config: &ResamplerConfig) -> Result<()> {
    let ratio = Ratio::new(up, down)?;
    let design = design_for_ratio(ratio, &config.quality)?;
    let bank = PolyphaseBank::new(&design.taps, ratio.up() as usize, config.quality.precision)?;

    let mut result = serde_json::json!({
        "ratio": ratio.to_string(),
        "taps": design.len(),
        "taps_per_phase": bank.taps_per_phase(),
        "beta": design.beta,
        "cutoff": design.cutoff,
        "band_edge": design.band_edge,
        "group_delay": design.group_delay(),
        "attenuation_db": config.quality.attenuation_db,
        "transition_width": config.quality.transition_width,
    });

    if coefficients {
        result["coefficients"] = serde_json::to_value(&design.taps)?;
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
