//! Cell-level differencing between consecutive quantized frames.
//!
//! Only the bounding rectangle of changed cells is walked when building
//! the change set. Rows outside it are rejected with a slice compare.

use thiserror::Error;

use super::{ChangeSet, PixelChange, QuantizedFrame};

/// Errors raised by the diff stage.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("frame dimensions differ: {prev:?} vs {next:?}")]
    DimensionMismatch { prev: (u32, u32), next: (u32, u32) },
    #[error("expected {expected} cells, got {got}")]
    CellCount { expected: usize, got: usize },
    #[error("frame {frame}: cell ({x}, {y}) outside {width}x{height} grid")]
    OutOfBounds {
        frame: u64,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("frame {frame}: color {color} outside palette of {palette_len}")]
    InvalidColor {
        frame: u64,
        color: u8,
        palette_len: usize,
    },
    #[error("diff map json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("diff map io: {0}")]
    Io(#[from] std::io::Error),
}

/// Inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Bounds {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

fn check_dimensions(prev: &QuantizedFrame, next: &QuantizedFrame) -> Result<(), DiffError> {
    if prev.dimensions() != next.dimensions() {
        return Err(DiffError::DimensionMismatch {
            prev: prev.dimensions(),
            next: next.dimensions(),
        });
    }
    Ok(())
}

/// Smallest rectangle containing every cell that differs, or `None` if
/// the frames are identical.
pub fn changed_bounds(
    prev: &QuantizedFrame,
    next: &QuantizedFrame,
) -> Result<Option<Bounds>, DiffError> {
    check_dimensions(prev, next)?;

    let height = prev.height();
    let rows_differ = |y: u32| prev.row(y) != next.row(y);

    let Some(top) = (0..height).find(|&y| rows_differ(y)) else {
        return Ok(None);
    };
    // A differing row exists, so this search always succeeds.
    let bottom = (top..height).rev().find(|&y| rows_differ(y)).unwrap_or(top);

    let mut left = u32::MAX;
    let mut right = 0;
    for y in top..=bottom {
        let (a, b) = (prev.row(y), next.row(y));
        if let Some(first) = a.iter().zip(b).position(|(p, n)| p != n) {
            left = left.min(first as u32);
            let last = a.iter().zip(b).rposition(|(p, n)| p != n).unwrap_or(first);
            right = right.max(last as u32);
        }
    }

    Ok(Some(Bounds {
        left,
        top,
        right,
        bottom,
    }))
}

/// Returns the cells where `next` differs from `prev`, carrying the new
/// color, in row-major order.
pub fn diff_frames(prev: &QuantizedFrame, next: &QuantizedFrame) -> Result<ChangeSet, DiffError> {
    let Some(bounds) = changed_bounds(prev, next)? else {
        return Ok(ChangeSet::new());
    };

    let mut changes = ChangeSet::new();
    for y in bounds.top..=bounds.bottom {
        let (a, b) = (prev.row(y), next.row(y));
        for x in bounds.left..=bounds.right {
            let (p, n) = (a[x as usize], b[x as usize]);
            if p != n {
                changes.push(PixelChange::new(x, y, n));
            }
        }
    }

    tracing::trace!(
        changes = changes.len(),
        bounds = ?bounds,
        "Computed frame diff"
    );
    Ok(changes)
}
