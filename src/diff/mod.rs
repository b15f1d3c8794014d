//! Change detection between quantized frames.
//!
//! Consecutive frames are compared cell by cell; only cells that change
//! are recorded. The resulting [`DiffMap`] is the sole input to the
//! script compiler.

mod accumulator;
mod changes;
mod engine;
mod grid;

pub use accumulator::DiffAccumulator;
pub use changes::{ChangeSet, DiffMap, PixelChange};
pub use engine::{changed_bounds, diff_frames, Bounds, DiffError};
pub use grid::{QuantizedFrame, BLANK};
