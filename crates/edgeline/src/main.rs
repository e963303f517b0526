//! edgeline: turn an image into smoothed vector line drawings.
//!
//! Runs edge detection at one or more blur sigmas and writes one SVG per
//! sigma, either as files or as a framed stream on stdout.
//!
//! # Usage
//!
//! ```text
//! edgeline [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Without `--output-dir`, stdout receives
//!
//! ```text
//! SVG_CONTENT_START
//! <svg for first sigma>
//! SVG_CONTENT_SEPARATOR
//! <svg for second sigma>
//! SVG_CONTENT_END
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser, ValueEnum};
use edgeline_export::SvgMetadata;
use edgeline_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use edgeline_pipeline::{PipelineConfig, TracerKind, VectorDocument};
use tracing_subscriber::EnvFilter;

/// Convert an image into vector line art traced from its edges.
///
/// Each `--sigma` produces one drawing: larger values blur more before
/// edge detection and keep only the stronger outlines.
#[derive(Parser)]
#[command(name = "edgeline", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Gaussian blur sigma before edge detection. Repeat for several drawings.
    #[arg(long = "sigma", default_values_t = [1.0_f32, 2.0])]
    sigmas: Vec<f32>,

    /// Canny low threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Curve smoothing residual budget (0 interpolates exactly).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SMOOTHING_FACTOR)]
    smoothing: f64,

    /// Side length of the square output frame.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_FRAME_SIZE)]
    frame_size: f64,

    /// Path tracing policy.
    #[arg(long, value_enum, default_value_t = Tracer::Greedy)]
    tracer: Tracer,

    /// Skip thinning the edge mask before tracing.
    #[arg(long)]
    no_thin: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, the individual parameter flags are ignored; the
    /// sigma list still comes from `--sigma`.
    #[arg(long)]
    config_json: Option<String>,

    /// Write `<stem>-sigma<N>.svg` files here instead of printing to stdout.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print each run's diagnostics report to stderr.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON on stdout.
    #[arg(long, requires = "output_dir")]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Path tracing policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    /// First unvisited neighbor in fixed scan order.
    Greedy,
    /// Neighbor that best keeps the current heading.
    DirectionContinuity,
}

impl From<Tracer> for TracerKind {
    fn from(tracer: Tracer) -> Self {
        match tracer {
            Tracer::Greedy => Self::Greedy,
            Tracer::DirectionContinuity => Self::DirectionContinuity,
        }
    }
}

/// Build a [`PipelineConfig`] from CLI arguments, minus the sigma.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        canny_low: cli.canny_low,
        canny_high: cli.canny_high,
        thin: !cli.no_thin,
        tracer: cli.tracer.into(),
        smoothing_factor: cli.smoothing,
        frame_size: cli.frame_size,
        ..PipelineConfig::default()
    })
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let base = config_from_cli(cli)?;
    base.validate().map_err(|e| e.to_string())?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    tracing::info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        sigmas = ?cli.sigmas,
        "loaded image"
    );

    let stem = cli
        .image_path
        .file_stem()
        .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned());

    let mut rendered = Vec::with_capacity(cli.sigmas.len());
    let mut all_diagnostics = Vec::new();

    for &sigma in &cli.sigmas {
        let config = PipelineConfig {
            blur_sigma: sigma,
            ..base.clone()
        };
        let document = if cli.diagnostics || cli.json {
            let (document, diagnostics) =
                edgeline_pipeline::process_with_diagnostics(&image_bytes, &config, &StdClock)
                    .map_err(|e| format!("Pipeline error (sigma={sigma}): {e}"))?;
            if cli.diagnostics {
                eprintln!("--- sigma={sigma} ---\n{}\n", diagnostics.report());
            }
            all_diagnostics.push(diagnostics);
            document
        } else {
            edgeline_pipeline::process(&image_bytes, &config)
                .map_err(|e| format!("Pipeline error (sigma={sigma}): {e}"))?
        };
        tracing::info!(sigma, paths = document.paths.len(), "vectorized");
        rendered.push((sigma, render(&document, &stem, &config)));
    }

    if let Some(ref dir) = cli.output_dir {
        write_files(dir, &stem, &rendered)?;
        if cli.json {
            print_json(&all_diagnostics)?;
        }
    } else {
        let svgs: Vec<String> = rendered.into_iter().map(|(_, svg)| svg).collect();
        print!("{}", edgeline_export::frame_documents(&svgs));
    }

    Ok(())
}

fn render(document: &VectorDocument, stem: &str, config: &PipelineConfig) -> String {
    let description = format!(
        "sigma={} canny={}/{} smoothing={} tracer={:?}",
        config.blur_sigma, config.canny_low, config.canny_high, config.smoothing_factor, config.tracer,
    );
    let metadata = SvgMetadata {
        title: Some(stem),
        description: Some(&description),
    };
    edgeline_export::to_svg_with_metadata(document, &metadata)
}

fn write_files(dir: &Path, stem: &str, rendered: &[(f32, String)]) -> Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
    for (sigma, svg) in rendered {
        let path = dir.join(format!("{stem}-sigma{sigma}.svg"));
        std::fs::write(&path, svg).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = svg.len(), "wrote svg");
    }
    Ok(())
}

fn print_json(diagnostics: &[PipelineDiagnostics]) -> Result<(), String> {
    let json = serde_json::to_string_pretty(diagnostics)
        .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
    println!("{json}");
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
