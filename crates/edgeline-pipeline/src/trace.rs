//! Path tracing: walk connected edge pixels into ordered polylines.
//!
//! This module defines the [`PathTracer`] trait for pluggable traversal
//! policies and the [`TracerKind`] enum for selecting one at runtime.
//!
//! Every policy shares the same outer loop: cells are scanned in
//! row-major order and each set, unvisited cell seeds a walk. The walk
//! claims one unvisited set neighbor at a time until none remain. A cell
//! is claimed by at most one path, and walks that never leave their seed
//! are dropped. The policies only differ in which neighbor a walk claims
//! when several qualify.
//!
//! # Branch points
//!
//! A walk follows a single successor. At a junction the other branches
//! are left behind and only become paths of their own if the outer scan
//! later reaches one of their unvisited cells. Branches the walk already
//! consumed are never revisited, so skeleton junctions can come out
//! under- or over-connected.

use serde::{Deserialize, Serialize};

use crate::mask::{BinaryMask, NEIGHBOR_OFFSETS};
use crate::types::{Point, Polyline};

/// Selects which traversal policy the tracer uses at each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TracerKind {
    /// Claim the first qualifying neighbor in
    /// [`NEIGHBOR_OFFSETS`] order.
    ///
    /// Deterministic but not direction-aware: on diagonal-heavy
    /// skeletons the walk may cut across a junction rather than
    /// continue straight.
    #[default]
    Greedy,

    /// Claim the qualifying neighbor whose step deviates least from the
    /// previous step's direction.
    ///
    /// Ties, and the first step of every walk, fall back to
    /// [`NEIGHBOR_OFFSETS`] order.
    DirectionContinuity,
}

/// Trait for path tracing strategies.
///
/// Input: a binary mask, ideally one pixel wide.
/// Output: polylines of at least 2 points in raster order of their seeds.
pub trait PathTracer {
    /// Trace all paths in the mask.
    fn trace(&self, mask: &BinaryMask) -> Vec<Polyline>;
}

impl PathTracer for TracerKind {
    fn trace(&self, mask: &BinaryMask) -> Vec<Polyline> {
        let mut visited = VisitGrid::new(mask);
        let mut paths = Vec::new();

        for (x, y) in mask.iter_set() {
            if visited.is_visited(x, y) {
                continue;
            }
            let path = walk(mask, &mut visited, (x, y), *self);
            if path.len() > 1 {
                paths.push(path);
            }
        }

        tracing::debug!(
            tracer = ?self,
            paths = paths.len(),
            points = paths.iter().map(Polyline::len).sum::<usize>(),
            "traced mask"
        );
        paths
    }
}

/// Same-shape companion to a [`BinaryMask`] recording claimed cells.
///
/// Owned by a single trace call; starts all `false` and is only ever set.
struct VisitGrid {
    width: usize,
    cells: Vec<bool>,
}

impl VisitGrid {
    fn new(mask: &BinaryMask) -> Self {
        Self {
            width: mask.width() as usize,
            cells: vec![false; mask.cells().len()],
        }
    }

    fn is_visited(&self, x: u32, y: u32) -> bool {
        self.cells[y as usize * self.width + x as usize]
    }

    fn claim(&mut self, x: u32, y: u32) {
        self.cells[y as usize * self.width + x as usize] = true;
    }
}

/// Walk from `start`, claiming one neighbor per step.
fn walk(
    mask: &BinaryMask,
    visited: &mut VisitGrid,
    start: (u32, u32),
    kind: TracerKind,
) -> Polyline {
    let (mut x, mut y) = start;
    visited.claim(x, y);
    let mut points = vec![cell_point(x, y)];
    let mut heading: Option<(i32, i32)> = None;

    loop {
        let mut candidates = NEIGHBOR_OFFSETS.iter().filter_map(|&off| {
            let (nx, ny) = mask.offset(x, y, off)?;
            (mask.is_set(nx, ny) && !visited.is_visited(nx, ny)).then_some((off, nx, ny))
        });

        let next = match (kind, heading) {
            (TracerKind::Greedy, _) | (TracerKind::DirectionContinuity, None) => {
                candidates.next()
            }
            (TracerKind::DirectionContinuity, Some(prev)) => {
                // `min_by_key` keeps the first minimum, preserving scan order on ties.
                candidates.min_by_key(|&(off, _, _)| turn_cost(prev, off))
            }
        };

        let Some((off, nx, ny)) = next else {
            break;
        };
        visited.claim(nx, ny);
        points.push(cell_point(nx, ny));
        heading = Some(off);
        x = nx;
        y = ny;
    }

    Polyline::new(points)
}

/// Angular distance between two 8-connected steps, in 45-degree units (0..=4).
fn turn_cost(prev: (i32, i32), next: (i32, i32)) -> u8 {
    let a = octant(prev);
    let b = octant(next);
    let diff = a.abs_diff(b);
    diff.min(8 - diff)
}

/// Compass index of a `(d_row, d_col)` step, counter-clockwise from east.
const fn octant(step: (i32, i32)) -> u8 {
    match step {
        (0, 1) => 0,
        (-1, 1) => 1,
        (-1, 0) => 2,
        (-1, -1) => 3,
        (0, -1) => 4,
        (1, -1) => 5,
        (1, 0) => 6,
        _ => 7,
    }
}

/// Convert a cell address into a raw path point (`x` = column, `y` = row).
fn cell_point(x: u32, y: u32) -> Point {
    Point::new(f64::from(x), f64::from(y))
}
