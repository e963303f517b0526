//! Vector emission: turn smoothed paths into move/line command lists.
//!
//! Each path of two or more points becomes one [`PathElement`]: a
//! `MoveTo` to its first point followed by a `LineTo` for every later
//! point. Coordinates are rounded to one decimal place and stay in mask
//! space; the [`Transform`] travels with the [`VectorDocument`].

use crate::types::{
    PathCommand, PathElement, Point, Polyline, StrokeStyle, Transform, VectorDocument,
};

/// Assemble the vector document.
///
/// Paths with fewer than 2 points are skipped since they have no
/// drawable segment. Path order is preserved.
#[must_use = "returns the assembled document"]
pub fn emit(paths: &[Polyline], transform: Transform, frame_size: f64) -> VectorDocument {
    let elements: Vec<PathElement> = paths.iter().filter_map(path_element).collect();

    tracing::debug!(
        input = paths.len(),
        emitted = elements.len(),
        frame_size,
        "emitted vector document"
    );

    VectorDocument {
        frame_size,
        transform,
        paths: elements,
    }
}

/// Build one path element, or `None` for a path too short to draw.
#[must_use]
pub fn path_element(path: &Polyline) -> Option<PathElement> {
    let points = path.points();
    if points.len() < 2 {
        return None;
    }

    let commands = points
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let p = round_point(p);
            if i == 0 {
                PathCommand::MoveTo(p)
            } else {
                PathCommand::LineTo(p)
            }
        })
        .collect();

    Some(PathElement {
        commands,
        style: StrokeStyle::default(),
    })
}

/// Round a value to the nearest tenth.
///
/// Rounds the exact decimal value of `v`, ties to even, so `0.15` (stored
/// as `0.1499..`) becomes `0.1` and an exact `0.25` becomes `0.2`. Scaling
/// by ten first would round the already-inexact product instead.
///
/// Negative zero is normalized to `0.0` so it never serializes as `-0`.
#[must_use]
pub fn round_tenth(v: f64) -> f64 {
    format!("{v:.1}").parse::<f64>().unwrap_or(v) + 0.0
}

fn round_point(p: Point) -> Point {
    Point::new(round_tenth(p.x), round_tenth(p.y))
}
