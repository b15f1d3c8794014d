//! Frame-by-frame diff accumulation.
//!
//! Holds exactly one retained frame, seeded with the blank device state,
//! and records the change set of every transition that changes something.

use super::{diff_frames, DiffError, DiffMap, QuantizedFrame};

/// Builds a [`DiffMap`] from quantized frames fed in source order.
pub struct DiffAccumulator {
    /// Previous frame for differencing.
    previous: QuantizedFrame,
    /// Changes recorded so far.
    diffs: DiffMap,
    /// Index assigned to the next pushed frame.
    next_index: u64,
}

impl DiffAccumulator {
    /// Creates an accumulator for a `width` x `height` grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_initial(QuantizedFrame::blank(width, height))
    }

    /// Creates an accumulator whose frame 0 is diffed against `initial`.
    pub fn with_initial(initial: QuantizedFrame) -> Self {
        Self {
            previous: initial,
            diffs: DiffMap::new(),
            next_index: 0,
        }
    }

    /// Diffs `frame` against the retained frame, records any changes under
    /// the next frame index and retains `frame`.
    ///
    /// Returns the number of changed cells.
    pub fn push(&mut self, frame: QuantizedFrame) -> Result<usize, DiffError> {
        let changes = diff_frames(&self.previous, &frame)?;
        let index = self.next_index;
        let count = changes.len();

        if self.diffs.insert(index, changes) {
            tracing::debug!(frame = index, changes = count, "Frame changed");
        } else {
            tracing::trace!(frame = index, "Frame unchanged");
        }

        self.previous = frame;
        self.next_index += 1;
        Ok(count)
    }

    /// The most recently pushed frame (or the initial frame).
    pub fn previous(&self) -> &QuantizedFrame {
        &self.previous
    }

    /// Changes recorded so far.
    pub fn diffs(&self) -> &DiffMap {
        &self.diffs
    }

    /// Number of frames pushed.
    pub fn frames_processed(&self) -> u64 {
        self.next_index
    }

    /// Consumes the accumulator and returns the diff map.
    pub fn finish(self) -> DiffMap {
        self.diffs
    }
}
