//! Compiled control program.
//!
//! The program is a small IR: one unit per changed frame, an optional
//! noise unit, and the parameters of the per-step main loop. Script
//! emitters render it to text and the simulator executes it directly, so
//! both agree on what a step does:
//!
//! 1. `relative = steps_since_start / speed_divisor`
//! 2. `relative <= settle_in_frames`: run noise (every step).
//!    Otherwise, the first step at a new `relative` runs the unit for
//!    frame `relative - settle_in_frames - 1`, if there is one.
//! 3. Fire the redraw trigger: advance the phase, rewrite the corrected
//!    corner cell with its held value and touch the screen at
//!    `touch_origin + phase`.

use super::{CompilerOptions, RedrawTrigger};
use crate::config::TargetProfile;

/// Memory value of palette index 0. Zero is reserved for "never painted".
pub const COLOR_BASE: u8 = 1;

/// One of the two bottom-right cells consumed by the redraw touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    /// Cell `(W-1, H-1)`.
    Last,
    /// Cell `(W-2, H-1)`.
    SecondLast,
}

impl Corner {
    pub const ALL: [Corner; 2] = [Corner::Last, Corner::SecondLast];

    /// Grid coordinates on a `width` x `height` screen.
    pub fn cell(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Corner::Last => (width - 1, height - 1),
            Corner::SecondLast => (width - 2, height - 1),
        }
    }

    /// Finds the corner at `(x, y)`, if it is one.
    pub fn at(x: u32, y: u32, width: u32, height: u32) -> Option<Corner> {
        Self::ALL
            .into_iter()
            .find(|corner| corner.cell(width, height) == (x, y))
    }

    /// Slot in per-corner arrays.
    #[inline]
    pub fn slot(self) -> usize {
        match self {
            Corner::Last => 0,
            Corner::SecondLast => 1,
        }
    }
}

/// Value one touch short of `value`, wrapping `1 -> palette_len`.
///
/// `value` is a memory value (1-based color).
pub fn backbuffer_value(value: u8, palette_len: usize) -> u8 {
    if value <= COLOR_BASE {
        palette_len as u8
    } else {
        value - 1
    }
}

/// Value after one touch on a cell holding `value`, wrapping
/// `palette_len -> 1`.
pub fn touched_value(value: u8, palette_len: usize) -> u8 {
    if usize::from(value) >= palette_len {
        COLOR_BASE
    } else {
        value + 1
    }
}

/// A single byte write into the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryWrite {
    pub x: u32,
    pub y: u32,
    pub address: u32,
    /// Memory value, already offset by [`COLOR_BASE`].
    pub value: u8,
}

/// Work performed when a source frame plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameUnit {
    /// Source frame index.
    pub frame: u64,
    pub writes: Vec<MemoryWrite>,
    /// Held correction values updated by this unit, applied after the
    /// writes in order.
    pub corrections: Vec<(Corner, u8)>,
}

/// Fills every cell with a random value in `1..=max_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseUnit {
    pub max_value: u8,
}

/// What a playback index resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch<'a> {
    Noise,
    Frame(&'a FrameUnit),
    Idle,
}

/// A compiled, immutable control program.
#[derive(Debug, Clone)]
pub struct ControlProgram {
    pub(super) profile: TargetProfile,
    pub(super) options: CompilerOptions,
    pub(super) noise: Option<NoiseUnit>,
    /// Sorted by frame index.
    pub(super) units: Vec<FrameUnit>,
}

impl ControlProgram {
    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn noise(&self) -> Option<&NoiseUnit> {
        self.noise.as_ref()
    }

    /// Frame units in ascending frame order.
    pub fn units(&self) -> &[FrameUnit] {
        &self.units
    }

    /// Looks up the unit for source frame `frame`.
    pub fn unit(&self, frame: u64) -> Option<&FrameUnit> {
        self.units
            .binary_search_by_key(&frame, |unit| unit.frame)
            .ok()
            .map(|i| &self.units[i])
    }

    /// Playback index for a step counted from the start snapshot.
    #[inline]
    pub fn relative_index(&self, steps_since_start: u64) -> u64 {
        steps_since_start / self.options.speed_divisor
    }

    /// First playback index that plays video content.
    #[inline]
    pub fn first_content_index(&self) -> u64 {
        self.options.settle_in_frames + 1
    }

    /// Resolves a playback index. Indices with no unit are [`Dispatch::Idle`].
    pub fn dispatch(&self, relative: u64) -> Dispatch<'_> {
        match relative.checked_sub(self.first_content_index()) {
            None if self.noise.is_some() => Dispatch::Noise,
            None => Dispatch::Idle,
            Some(frame) => self.unit(frame).map_or(Dispatch::Idle, Dispatch::Frame),
        }
    }

    /// Corner whose held value is written at `phase`.
    #[inline]
    pub fn corrected_corner(&self, phase: u32) -> Corner {
        if phase >= self.options.phase_midpoint() {
            Corner::Last
        } else {
            Corner::SecondLast
        }
    }

    /// Stylus position in device pixels at `phase`.
    #[inline]
    pub fn touch_position(&self, phase: u32) -> (u32, u32) {
        let [x, y] = self.profile.touch_origin_px;
        (x + phase, y)
    }

    /// Memory address of a corner cell.
    pub fn corner_address(&self, corner: Corner) -> u32 {
        let (x, y) = corner.cell(self.profile.width, self.profile.height);
        self.profile.cell_address(x, y)
    }

    /// Steps needed before every frame unit has been dispatched.
    pub fn playback_steps(&self) -> u64 {
        let last_index = match self.units.last() {
            Some(unit) => self.first_content_index() + unit.frame,
            None => self.options.settle_in_frames,
        };
        (last_index + 1) * self.options.speed_divisor
    }

    /// Total framebuffer writes across all frame units.
    pub fn total_writes(&self) -> usize {
        self.units.iter().map(|unit| unit.writes.len()).sum()
    }

    pub fn redraw_trigger(&self) -> RedrawTrigger {
        self.options.redraw_trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backbuffer_value_wraps() {
        assert_eq!(backbuffer_value(1, 4), 4);
        assert_eq!(backbuffer_value(2, 4), 1);
        assert_eq!(backbuffer_value(4, 4), 3);
    }

    #[test]
    fn test_touch_undoes_backbuffer() {
        for value in 1..=4 {
            assert_eq!(touched_value(backbuffer_value(value, 4), 4), value);
        }
        assert_eq!(touched_value(0, 4), 1);
    }

    #[test]
    fn test_corner_cells() {
        assert_eq!(Corner::Last.cell(24, 20), (23, 19));
        assert_eq!(Corner::SecondLast.cell(24, 20), (22, 19));
        assert_eq!(Corner::at(22, 19, 24, 20), Some(Corner::SecondLast));
        assert_eq!(Corner::at(22, 18, 24, 20), None);
    }
}
