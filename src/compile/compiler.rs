//! Diff map to control program compilation.

use thiserror::Error;

use super::program::{backbuffer_value, Corner, FrameUnit, MemoryWrite, NoiseUnit, COLOR_BASE};
use super::{CompilerOptions, ControlProgram};
use crate::config::{ConfigError, TargetProfile};
use crate::diff::{DiffError, DiffMap};

/// Errors raised before any program is produced.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid diff map: {0}")]
    Diff(#[from] DiffError),
    #[error(
        "playback of frame {frame} overflows the step counter \
         (settle-in {settle_in_frames}, divisor {speed_divisor})"
    )]
    PlaybackOverflow {
        frame: u64,
        settle_in_frames: u64,
        speed_divisor: u64,
    },
    #[error("redraw touch at phase {phase} lands on {got:?}, expected cell {expected:?}")]
    TouchGeometry {
        phase: u32,
        expected: (u32, u32),
        got: Option<(u32, u32)>,
    },
}

/// Compiles [`DiffMap`]s for one target profile.
#[derive(Debug, Clone)]
pub struct Compiler {
    profile: TargetProfile,
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(profile: TargetProfile, options: CompilerOptions) -> Self {
        Self { profile, options }
    }

    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Validates `diffs` against the profile and builds the program.
    ///
    /// All checks run before anything is built, so a malformed map never
    /// yields a partial program.
    pub fn compile(&self, diffs: &DiffMap) -> Result<ControlProgram, CompileError> {
        self.profile.validate()?;
        self.options.validate()?;
        let palette_len = self.profile.palette.len();
        diffs.validate(self.profile.width, self.profile.height, palette_len)?;
        if self.options.backbuffer_correction {
            self.check_touch_geometry()?;
        }
        self.check_playback_range(diffs)?;

        let units: Vec<FrameUnit> = diffs
            .iter()
            .map(|(frame, changes)| {
                let mut unit = FrameUnit {
                    frame,
                    writes: Vec::with_capacity(changes.len()),
                    corrections: Vec::new(),
                };
                for change in changes {
                    let value = change.color + COLOR_BASE;
                    unit.writes.push(MemoryWrite {
                        x: change.x,
                        y: change.y,
                        address: self.profile.cell_address(change.x, change.y),
                        value,
                    });
                    if !self.options.backbuffer_correction {
                        continue;
                    }
                    if let Some(corner) =
                        Corner::at(change.x, change.y, self.profile.width, self.profile.height)
                    {
                        unit.corrections
                            .push((corner, backbuffer_value(value, palette_len)));
                    }
                }
                unit
            })
            .collect();

        let noise = self.options.noise.then(|| NoiseUnit {
            // Leaves room for the redraw touch to add one.
            max_value: (palette_len - 1) as u8,
        });

        let program = ControlProgram {
            profile: self.profile.clone(),
            options: self.options.clone(),
            noise,
            units,
        };

        tracing::info!(
            units = program.units().len(),
            writes = program.total_writes(),
            playback_steps = program.playback_steps(),
            "Compiled control program"
        );
        Ok(program)
    }

    /// The step count needed to reach the last frame must fit in a `u64`.
    fn check_playback_range(&self, diffs: &DiffMap) -> Result<(), CompileError> {
        let settle = self.options.settle_in_frames;
        let divisor = self.options.speed_divisor;
        let last = diffs.frame_indices().max();
        let steps = match last {
            Some(frame) => settle.checked_add(2).and_then(|n| n.checked_add(frame)),
            None => settle.checked_add(1),
        }
        .and_then(|n| n.checked_mul(divisor));

        match steps {
            Some(_) => Ok(()),
            None => Err(CompileError::PlaybackOverflow {
                frame: last.unwrap_or(0),
                settle_in_frames: settle,
                speed_divisor: divisor,
            }),
        }
    }

    /// Every phase's touch must land on the corner corrected at that phase.
    fn check_touch_geometry(&self) -> Result<(), CompileError> {
        let (width, height) = (self.profile.width, self.profile.height);
        let [origin_x, origin_y] = self.profile.touch_origin_px;
        for phase in self.options.phases() {
            let corner = if phase >= self.options.phase_midpoint() {
                Corner::Last
            } else {
                Corner::SecondLast
            };
            let expected = corner.cell(width, height);
            let got = self.profile.cell_at_px(origin_x + phase, origin_y);
            if got != Some(expected) {
                return Err(CompileError::TouchGeometry {
                    phase,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }
}
