#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a scripted kinetic perimetry examination.

mod headless;
mod scene;
mod script;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use kinetic_perimetry_core::{Clock, ManualClock, PerimetryConfig, SystemClock};
use kinetic_perimetry_export::{export_to_path, write_export, ExportFormat};
use kinetic_perimetry_rendering::{FrameInput, Presentation, RenderingBackend};
use kinetic_perimetry_session::{Session, SessionInput, ViewAngles};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use crate::{headless::HeadlessBackend, script::Script};

#[derive(Debug, Parser)]
#[command(
    name = "kinetic-perimetry",
    about = "Replays a scripted kinetic perimetry examination and exports the responses"
)]
struct CliArgs {
    /// Examination configuration in TOML; defaults are used when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Timed operator actions in TOML.
    #[arg(long, value_name = "PATH")]
    script: PathBuf,
    /// Seed for the random meridian order.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Simulated frame step in milliseconds.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    frame_ms: u64,
    /// Seconds after which an unfinished replay is stopped.
    #[arg(long, default_value_t = 900.0)]
    max_secs: f64,
    /// File receiving the response log; stdout when omitted.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Export format; guessed from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => Self::Csv,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Entry point for the kinetic perimetry command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(&args.log_level)?;

    let config = load_config(args.config.as_deref())?;
    let script = Script::load(&args.script)?;
    let time_limit = Duration::try_from_secs_f64(args.max_secs)
        .with_context(|| format!("invalid --max-secs {}", args.max_secs))?;

    let mut session = Session::new(&config, ChaCha8Rng::seed_from_u64(args.seed))
        .context("failed to set up the examination session")?;
    let mut clock = ManualClock::new();
    let initial = session.step(&SessionInput::default(), clock.now());
    let presentation = Presentation::new(
        "Kinetic perimetry",
        scene::CLEAR_COLOR,
        scene::initial_scene(session.sequencer(), scene::focus_marker(&initial))?,
    );

    let wall_clock = SystemClock::new();
    let backend = HeadlessBackend::new(Duration::from_millis(args.frame_ms), time_limit, script);
    let mut failure = None;
    let mut visible_frames = 0_u64;
    backend.run(presentation, |dt, input, scene| {
        clock.advance(dt);
        let frame = session.step(&session_input(input), clock.now());
        if let Err(error) = scene::apply_frame(scene, &frame, session.sequencer(), input.view_deg)
        {
            let _ = failure.get_or_insert(error);
        }
        if scene.stimulus_on_screen().is_some() {
            visible_frames += 1;
        }
    })?;
    if let Some(error) = failure {
        return Err(anyhow!(error).context("failed to update the scene"));
    }

    let log = session.response_log();
    tracing::info!(
        responses = log.len(),
        status = %session.sequencer().status(),
        visible_frames,
        simulated_secs = clock.now().as_secs_f64(),
        wall_secs = wall_clock.now().as_secs_f64(),
        "examination replayed"
    );

    match args.output {
        Some(path) => {
            let format = args
                .format
                .map(ExportFormat::from)
                .or_else(|| ExportFormat::from_path(&path))
                .unwrap_or(ExportFormat::Csv);
            export_to_path(log, format, &path)?;
        }
        None => {
            let format = args.format.map_or(ExportFormat::Csv, ExportFormat::from);
            write_export(log, format, std::io::stdout().lock())
                .context("failed to write responses to stdout")?;
        }
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter {level:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("failed to initialise logging: {error}"))
}

fn load_config(path: Option<&Path>) -> Result<PerimetryConfig> {
    let Some(path) = path else {
        return Ok(PerimetryConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let config = PerimetryConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    Ok(config)
}

fn session_input(input: FrameInput) -> SessionInput {
    SessionInput {
        view: input
            .view_deg
            .map(|(pitch_deg, yaw_deg)| ViewAngles::new(pitch_deg, yaw_deg)),
        start: input.start,
        pause: input.pause,
        resume: input.resume,
        detect: input.detect,
    }
}
