//! Binary edge mask: the input grid for path tracing.
//!
//! [`BinaryMask`] wraps the boolean grid produced by edge detection and
//! thinning. It is immutable once built; the tracer keeps its own
//! visitation state alongside it.
//!
//! Cells are addressed as `(x, y)` where `x` is the column and `y` the
//! row, matching [`Point`](crate::Point).

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, GrayImage};

/// 8-connected neighbor offsets as `(d_row, d_col)`, in scan order.
///
/// The tracer relies on this exact order: rows above first, then the
/// same row, then rows below, each left to right.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Errors from building a mask out of malformed cell data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MaskError {
    /// A row's length differs from the first row's.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// The flat cell buffer does not hold `width * height` cells.
    #[error("expected {expected} cells, found {found}")]
    CellCount {
        /// `width * height`.
        expected: usize,
        /// Length of the supplied buffer.
        found: usize,
    },

    /// A side length does not fit in `u32`.
    #[error("mask side of {len} cells is too large")]
    TooLarge {
        /// The side length that overflowed.
        len: usize,
    },
}

/// Immutable 2D boolean grid, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    dimensions: Dimensions,
    cells: Vec<bool>,
}

impl BinaryMask {
    /// Build a mask from a row-major cell buffer.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::CellCount`] if `cells.len()` is not
    /// `width * height`.
    pub fn new(dimensions: Dimensions, cells: Vec<bool>) -> Result<Self, MaskError> {
        let expected = dimensions.width as usize * dimensions.height as usize;
        if cells.len() != expected {
            return Err(MaskError::CellCount {
                expected,
                found: cells.len(),
            });
        }
        Ok(Self { dimensions, cells })
    }

    /// A mask of the given size with every cell `false`.
    #[must_use]
    pub fn empty(dimensions: Dimensions) -> Self {
        let len = dimensions.width as usize * dimensions.height as usize;
        Self {
            dimensions,
            cells: vec![false; len],
        }
    }

    /// Build a mask by evaluating `f(x, y)` for every cell.
    #[must_use]
    pub fn from_fn(dimensions: Dimensions, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity(dimensions.width as usize * dimensions.height as usize);
        for y in 0..dimensions.height {
            for x in 0..dimensions.width {
                cells.push(f(x, y));
            }
        }
        Self { dimensions, cells }
    }

    /// Build a mask from nested rows (`rows[y][x]`).
    ///
    /// Zero rows produce a `0x0` mask.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::RaggedRows`] if the rows differ in length and
    /// [`MaskError::TooLarge`] if a side does not fit in `u32`.
    pub fn from_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<Self, MaskError> {
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        let mut cells = Vec::with_capacity(width * rows.len());
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != width {
                return Err(MaskError::RaggedRows {
                    row,
                    expected: width,
                    found: r.len(),
                });
            }
            cells.extend_from_slice(r);
        }
        let dimensions = Dimensions {
            width: u32::try_from(width).map_err(|_| MaskError::TooLarge { len: width })?,
            height: u32::try_from(rows.len()).map_err(|_| MaskError::TooLarge { len: rows.len() })?,
        };
        Ok(Self { dimensions, cells })
    }

    /// Convert a grayscale edge map: any nonzero pixel is an edge cell.
    #[must_use]
    pub fn from_gray(image: &GrayImage) -> Self {
        Self {
            dimensions: Dimensions {
                width: image.width(),
                height: image.height(),
            },
            cells: image.pixels().map(|p| p.0[0] != 0).collect(),
        }
    }

    /// Render the mask as a grayscale image (255 = set).
    #[must_use]
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.dimensions.width, self.dimensions.height, |x, y| {
            image::Luma([if self.is_set(x, y) { 255 } else { 0 }])
        })
    }

    /// Mask dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Row-major index of `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub const fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.dimensions.width && y < self.dimensions.height {
            Some(y as usize * self.dimensions.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Cell value, or `None` when `(x, y)` is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<bool> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// `true` if `(x, y)` is in bounds and set.
    #[must_use]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.get(x, y).unwrap_or(false)
    }

    /// Apply a `(d_row, d_col)` offset to `(x, y)`.
    ///
    /// Returns `None` if the result falls outside the grid.
    #[must_use]
    pub fn offset(&self, x: u32, y: u32, (d_row, d_col): (i32, i32)) -> Option<(u32, u32)> {
        let nx = x.checked_add_signed(d_col)?;
        let ny = y.checked_add_signed(d_row)?;
        self.index(nx, ny).map(|_| (nx, ny))
    }

    /// Set neighbors of `(x, y)`, in [`NEIGHBOR_OFFSETS`] order.
    pub fn set_neighbors(&self, x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |&off| self.offset(x, y, off))
            .filter(|&(nx, ny)| self.is_set(nx, ny))
    }

    /// Number of set cells.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Coordinates of all set cells in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.dimensions.width;
        (0..self.dimensions.height)
            .flat_map(move |y| (0..width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_set(x, y))
    }

    /// Row-major cell buffer.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }
}
