//! Pipeline diagnostics: timing and counts for each stage.
//!
//! The library is sans-IO, so it never reads a clock itself. Callers
//! pass a [`Clock`]; the CLI backs it with `std::time::Instant`, tests
//! use a fake that advances by a fixed step.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::edge;
use crate::mask::BinaryMask;
use crate::normalize::compute_transform;
use crate::smooth::{Smoothed, smooth_paths};
use crate::thin::thin;
use crate::trace::PathTracer;
use crate::types::{PipelineConfig, PipelineError, Polyline, VectorDocument};
use crate::{emit, grayscale};

/// Time source injected into the instrumented pipeline.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// The raster stages are `None` when the run started from a mask
/// ([`vectorize_with_diagnostics`]); `thinning` is `None` when thinning
/// was disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Image decoding and grayscale conversion.
    pub decode: Option<StageDiagnostics>,
    /// Blur plus Canny.
    pub edge_detection: Option<StageDiagnostics>,
    /// Edge map to binary mask.
    pub mask_construction: Option<StageDiagnostics>,
    /// Zhang-Suen thinning.
    pub thinning: Option<StageDiagnostics>,
    /// Path tracing.
    pub tracing: StageDiagnostics,
    /// Curve smoothing.
    pub smoothing: StageDiagnostics,
    /// Frame transform.
    pub normalization: StageDiagnostics,
    /// Vector document assembly.
    pub emission: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Edge detection metrics.
    EdgeDetection {
        /// Blur sigma.
        sigma: f32,
        /// Low threshold as configured.
        low_threshold: f32,
        /// High threshold as configured.
        high_threshold: f32,
        /// Number of edge pixels in the output.
        edge_pixel_count: u64,
        /// Total pixel count, for edge density.
        total_pixel_count: u64,
    },
    /// Mask construction metrics.
    MaskConstruction {
        /// Number of set cells.
        set_cells: usize,
    },
    /// Thinning metrics.
    Thinning {
        /// Set cells before thinning.
        cells_before: usize,
        /// Set cells after thinning.
        cells_after: usize,
    },
    /// Path tracing metrics.
    Tracing {
        /// Which tracer policy was used.
        tracer: String,
        /// Number of paths traced.
        path_count: usize,
        /// Total points across all paths.
        total_point_count: usize,
        /// Fewest points in any path.
        min_path_points: usize,
        /// Most points in any path.
        max_path_points: usize,
        /// Mean points per path.
        mean_path_points: f64,
    },
    /// Curve smoothing metrics.
    Smoothing {
        /// Residual budget.
        smoothing_factor: f64,
        /// Paths handed to the smoother.
        input_paths: usize,
        /// Paths fitted and resampled.
        fitted: usize,
        /// Paths too short to fit.
        unchanged: usize,
        /// Paths whose fit failed and were kept raw.
        fallbacks: usize,
        /// Total points before smoothing.
        points_before: usize,
        /// Total points after smoothing.
        points_after: usize,
    },
    /// Frame transform metrics.
    Normalization {
        /// Frame side length.
        frame_size: f64,
        /// Uniform scale.
        scale: f64,
        /// Horizontal offset.
        offset_x: f64,
        /// Vertical offset.
        offset_y: f64,
    },
    /// Emission metrics.
    Emission {
        /// Path elements in the document.
        path_count: usize,
        /// Paths dropped for having fewer than 2 points.
        skipped_paths: usize,
        /// Move and line commands across all elements.
        command_count: usize,
    },
}

/// High-level summary counts for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Mask width in pixels.
    pub mask_width: u32,
    /// Mask height in pixels.
    pub mask_height: u32,
    /// Paths traced.
    pub traced_paths: usize,
    /// Paths that fell back to their raw points.
    pub smoothing_fallbacks: usize,
    /// Path elements in the final document.
    pub emitted_paths: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Mask: {}x{}",
            self.summary.mask_width, self.summary.mask_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let optional = [
            ("Decode", self.decode.as_ref()),
            ("Edge Detection", self.edge_detection.as_ref()),
            ("Mask Construction", self.mask_construction.as_ref()),
            ("Thinning", self.thinning.as_ref()),
        ];
        let stages = optional
            .into_iter()
            .filter_map(|(name, diag)| diag.map(|d| (name, d)))
            .chain([
                ("Tracing", &self.tracing),
                ("Smoothing", &self.smoothing),
                ("Normalization", &self.normalization),
                ("Emission", &self.emission),
            ]);

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Paths traced: {}  |  Fallbacks: {}  |  Emitted: {}",
            self.summary.traced_paths,
            self.summary.smoothing_fallbacks,
            self.summary.emitted_paths,
        ));

        lines.join("\n")
    }
}

/// Run [`process`](crate::process) while recording per-stage diagnostics.
///
/// # Errors
///
/// Same as [`process`](crate::process).
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(VectorDocument, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let start = clock.now();

    let (gray, duration) = timed(clock, || grayscale::decode_and_grayscale(image_bytes));
    let gray = gray?;
    let decode = StageDiagnostics {
        duration,
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: gray.width(),
            height: gray.height(),
        },
    };

    let (edges, duration) = timed(clock, || {
        edge::detect_edges(&gray, config.blur_sigma, config.canny_low, config.canny_high)
    });
    let edge_detection = StageDiagnostics {
        duration,
        metrics: StageMetrics::EdgeDetection {
            sigma: config.blur_sigma,
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
            edge_pixel_count: edge::count_edge_pixels(&edges),
            total_pixel_count: u64::from(edges.width()) * u64::from(edges.height()),
        },
    };

    let (mask, duration) = timed(clock, || BinaryMask::from_gray(&edges));
    let mask_construction = StageDiagnostics {
        duration,
        metrics: StageMetrics::MaskConstruction {
            set_cells: mask.count_set(),
        },
    };

    let (document, mut diagnostics) = run_core(mask, config, clock)?;
    diagnostics.decode = Some(decode);
    diagnostics.edge_detection = Some(edge_detection);
    diagnostics.mask_construction = Some(mask_construction);
    diagnostics.total_duration = clock.elapsed(&start);
    Ok((document, diagnostics))
}

/// Run [`vectorize`](crate::vectorize) while recording per-stage
/// diagnostics.
///
/// The mask is used as given; thinning is not applied.
///
/// # Errors
///
/// Same as [`vectorize`](crate::vectorize).
pub fn vectorize_with_diagnostics<C: Clock>(
    mask: &BinaryMask,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(VectorDocument, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let start = clock.now();
    let config = PipelineConfig {
        thin: false,
        ..config.clone()
    };
    let (document, mut diagnostics) = run_core(mask.clone(), &config, clock)?;
    diagnostics.total_duration = clock.elapsed(&start);
    Ok((document, diagnostics))
}

/// Thin (if enabled), trace, smooth, normalize and emit.
fn run_core<C: Clock>(
    mask: BinaryMask,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(VectorDocument, PipelineDiagnostics), PipelineError> {
    let dimensions = mask.dimensions();

    let (transform, duration) = timed(clock, || {
        compute_transform(dimensions, config.frame_size)
    });
    let transform = transform?;
    let normalization = StageDiagnostics {
        duration,
        metrics: StageMetrics::Normalization {
            frame_size: config.frame_size,
            scale: transform.scale,
            offset_x: transform.offset_x,
            offset_y: transform.offset_y,
        },
    };

    let (mask, thinning) = if config.thin {
        let before = mask.count_set();
        let (thinned, duration) = timed(clock, || thin(&mask));
        let stage = StageDiagnostics {
            duration,
            metrics: StageMetrics::Thinning {
                cells_before: before,
                cells_after: thinned.count_set(),
            },
        };
        (thinned, Some(stage))
    } else {
        (mask, None)
    };

    let (raw, duration) = timed(clock, || config.tracer.trace(&mask));
    let stats = path_stats(&raw);
    let tracing = StageDiagnostics {
        duration,
        metrics: StageMetrics::Tracing {
            tracer: format!("{:?}", config.tracer),
            path_count: raw.len(),
            total_point_count: stats.total,
            min_path_points: stats.min,
            max_path_points: stats.max,
            mean_path_points: stats.mean,
        },
    };

    let (outcomes, duration) = timed(clock, || smooth_paths(&raw, config.smoothing_factor));
    let fitted = outcomes
        .iter()
        .filter(|o| matches!(o, Smoothed::Fitted(_)))
        .count();
    let unchanged = outcomes
        .iter()
        .filter(|o| matches!(o, Smoothed::Unchanged(_)))
        .count();
    let fallbacks = outcomes.iter().filter(|o| o.is_fallback()).count();
    let smoothed: Vec<Polyline> = outcomes.into_iter().map(Smoothed::into_polyline).collect();
    let smoothing = StageDiagnostics {
        duration,
        metrics: StageMetrics::Smoothing {
            smoothing_factor: config.smoothing_factor,
            input_paths: raw.len(),
            fitted,
            unchanged,
            fallbacks,
            points_before: stats.total,
            points_after: total_points(&smoothed),
        },
    };

    let (document, duration) = timed(clock, || {
        emit::emit(&smoothed, transform, config.frame_size)
    });
    let emission = StageDiagnostics {
        duration,
        metrics: StageMetrics::Emission {
            path_count: document.paths.len(),
            skipped_paths: smoothed.len() - document.paths.len(),
            command_count: document.command_count(),
        },
    };

    let summary = PipelineSummary {
        mask_width: dimensions.width,
        mask_height: dimensions.height,
        traced_paths: raw.len(),
        smoothing_fallbacks: fallbacks,
        emitted_paths: document.paths.len(),
    };

    let diagnostics = PipelineDiagnostics {
        decode: None,
        edge_detection: None,
        mask_construction: None,
        thinning,
        tracing,
        smoothing,
        normalization,
        emission,
        total_duration: Duration::ZERO,
        summary,
    };
    Ok((document, diagnostics))
}

fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let value = f();
    (value, clock.elapsed(&start))
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::EdgeDetection {
            sigma,
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "sigma={sigma:.2} low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::MaskConstruction { set_cells } => format!("{set_cells} set cells"),
        StageMetrics::Thinning {
            cells_before,
            cells_after,
        } => format!("{cells_before}->{cells_after} cells"),
        StageMetrics::Tracing {
            tracer,
            path_count,
            total_point_count,
            min_path_points,
            max_path_points,
            mean_path_points,
        } => format!(
            "{tracer} {path_count} paths, {total_point_count} pts (min={min_path_points} max={max_path_points} mean={mean_path_points:.1})",
        ),
        StageMetrics::Smoothing {
            smoothing_factor,
            input_paths,
            fitted,
            unchanged,
            fallbacks,
            points_before,
            points_after,
        } => format!(
            "s={smoothing_factor} {input_paths} paths (fitted={fitted} short={unchanged} fallback={fallbacks}) {points_before}->{points_after} pts",
        ),
        StageMetrics::Normalization {
            frame_size,
            scale,
            offset_x,
            offset_y,
        } => format!("frame={frame_size} scale={scale:.4} offset=({offset_x:.2},{offset_y:.2})"),
        StageMetrics::Emission {
            path_count,
            skipped_paths,
            command_count,
        } => format!("{path_count} paths ({skipped_paths} skipped), {command_count} commands"),
    }
}

/// Point-count statistics for a set of paths.
struct PathStats {
    total: usize,
    min: usize,
    max: usize,
    mean: f64,
}

fn path_stats(paths: &[Polyline]) -> PathStats {
    let total = total_points(paths);
    let min = paths.iter().map(Polyline::len).min().unwrap_or(0);
    let max = paths.iter().map(Polyline::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if paths.is_empty() {
        0.0
    } else {
        total as f64 / paths.len() as f64
    };
    PathStats {
        total,
        min,
        max,
        mean,
    }
}

fn total_points(paths: &[Polyline]) -> usize {
    paths.iter().map(Polyline::len).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::{Dimensions, Point};

    /// Fake clock that advances one millisecond per reading.
    struct StepClock {
        ticks: Cell<u64>,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn diagonal_mask() -> BinaryMask {
        BinaryMask::from_fn(
            Dimensions {
                width: 5,
                height: 5,
            },
            |x, y| x == y,
        )
    }

    fn encode_png(img: &image::GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn path_stats_empty() {
        let stats = path_stats(&[]);
        assert_eq!((stats.total, stats.min, stats.max), (0, 0, 0));
        assert!(stats.mean.abs() < f64::EPSILON);
    }

    #[test]
    fn path_stats_computes() {
        let paths = vec![
            Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]),
            Polyline::new((0..4).map(|i| Point::new(f64::from(i), 0.0)).collect()),
        ];
        let stats = path_stats(&paths);
        assert_eq!((stats.total, stats.min, stats.max), (6, 2, 4));
        assert!((stats.mean - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vectorize_diagnostics_match_document() {
        let (doc, diag) =
            vectorize_with_diagnostics(&diagonal_mask(), &PipelineConfig::default(), &StepClock::new())
                .unwrap();
        let plain = crate::vectorize(&diagonal_mask(), &PipelineConfig::default()).unwrap();
        assert_eq!(doc, plain);
        assert!(diag.decode.is_none());
        assert!(diag.thinning.is_none());
        assert_eq!(diag.summary.traced_paths, 1);
        assert_eq!(diag.summary.emitted_paths, 1);
        assert!(matches!(
            diag.smoothing.metrics,
            StageMetrics::Smoothing {
                input_paths: 1,
                fitted: 1,
                fallbacks: 0,
                points_before: 5,
                points_after: 10,
                ..
            }
        ));
        assert!(matches!(
            diag.emission.metrics,
            StageMetrics::Emission {
                path_count: 1,
                skipped_paths: 0,
                command_count: 10,
            }
        ));
        assert!(diag.total_duration > Duration::ZERO);
    }

    #[test]
    fn process_diagnostics_cover_raster_stages() {
        let img = image::GrayImage::from_fn(40, 30, |x, y| {
            image::Luma([if (10..30).contains(&x) && (8..22).contains(&y) { 255 } else { 0 }])
        });
        let (doc, diag) =
            process_with_diagnostics(&encode_png(&img), &PipelineConfig::default(), &StepClock::new())
                .unwrap();
        assert!(diag.decode.is_some());
        assert!(diag.edge_detection.is_some());
        assert!(diag.mask_construction.is_some());
        assert!(diag.thinning.is_some());
        assert_eq!(diag.summary.mask_width, 40);
        assert_eq!(diag.summary.emitted_paths, doc.paths.len());
        assert!(!doc.paths.is_empty());
    }

    #[test]
    fn degenerate_mask_is_an_error() {
        let mask = BinaryMask::empty(Dimensions {
            width: 0,
            height: 4,
        });
        let result =
            vectorize_with_diagnostics(&mask, &PipelineConfig::default(), &StepClock::new());
        assert!(matches!(result, Err(PipelineError::DegenerateMask { .. })));
    }

    #[test]
    fn report_names_every_stage_that_ran() {
        let (_, diag) =
            vectorize_with_diagnostics(&diagonal_mask(), &PipelineConfig::default(), &StepClock::new())
                .unwrap();
        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Tracing"));
        assert!(report.contains("Smoothing"));
        assert!(!report.contains("Decode"));
        assert!(report.contains("Greedy"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let (_, diag) =
            vectorize_with_diagnostics(&diagonal_mask(), &PipelineConfig::default(), &StepClock::new())
                .unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json["total_duration"].is_f64());
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        let drift = back.total_duration.abs_diff(diag.total_duration);
        assert!(drift < Duration::from_micros(1));
    }
}
