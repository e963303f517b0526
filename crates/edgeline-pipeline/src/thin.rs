//! Zhang-Suen thinning: reduce edge strokes to one-pixel width.
//!
//! Tracing assumes a skeleton. Canny output is mostly one pixel wide
//! already, but corners and closely spaced edges leave 2-3 pixel blobs
//! that would otherwise be walked as short zigzags.
//!
//! Each iteration runs two sub-passes. A set pixel `P1` with neighbors
//! `P2..P9` (clockwise from north) is deleted when
//!
//! - it has between 2 and 6 set neighbors,
//! - the circular sequence `P2, P3, .., P9, P2` has exactly one
//!   clear-to-set transition,
//! - pass 1: `P2*P4*P6 == 0` and `P4*P6*P8 == 0`,
//!   pass 2: `P2*P4*P8 == 0` and `P2*P6*P8 == 0`.
//!
//! Deletions within a pass are applied together. Iteration stops when a
//! full iteration deletes nothing. Pixels outside the grid count as clear.

use crate::mask::BinaryMask;

/// Clockwise neighbor offsets `(dx, dy)` starting north: `P2..P9`.
const RING: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

#[derive(Clone, Copy)]
enum SubPass {
    First,
    Second,
}

/// Thin a mask to a one-pixel-wide skeleton.
///
/// Never sets a pixel that was clear in the input.
#[must_use = "returns the thinned mask"]
pub fn thin(mask: &BinaryMask) -> BinaryMask {
    let dims = mask.dimensions();
    let width = dims.width as usize;
    let mut cells = mask.cells().to_vec();
    let mut iterations = 0_usize;
    let mut removed = 0_usize;

    loop {
        iterations += 1;
        let mut changed = false;
        for pass in [SubPass::First, SubPass::Second] {
            let doomed: Vec<usize> = cells
                .iter()
                .enumerate()
                .filter(|&(_, &set)| set)
                .map(|(i, _)| i)
                .filter(|&i| deletable(&cells, dims.width, dims.height, i % width, i / width, pass))
                .collect();
            for &i in &doomed {
                cells[i] = false;
            }
            removed += doomed.len();
            changed |= !doomed.is_empty();
        }
        if !changed {
            break;
        }
    }

    tracing::debug!(iterations, removed, "thinned mask");
    BinaryMask::from_fn(dims, |x, y| cells[y as usize * width + x as usize])
}

fn deletable(cells: &[bool], width: u32, height: u32, x: usize, y: usize, pass: SubPass) -> bool {
    let at = |(dx, dy): (i32, i32)| -> bool {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return false;
        };
        match (x.checked_add_signed(dx), y.checked_add_signed(dy)) {
            (Some(nx), Some(ny)) if nx < width && ny < height => {
                cells[ny as usize * width as usize + nx as usize]
            }
            _ => false,
        }
    };
    let p: [bool; 8] = RING.map(at);

    let set_count = p.iter().filter(|&&v| v).count();
    if !(2..=6).contains(&set_count) {
        return false;
    }

    let transitions = (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count();
    if transitions != 1 {
        return false;
    }

    let [p2, _, p4, _, p6, _, p8, _] = p;
    match pass {
        SubPass::First => !(p2 && p4 && p6) && !(p4 && p6 && p8),
        SubPass::Second => !(p2 && p4 && p8) && !(p2 && p6 && p8),
    }
}
