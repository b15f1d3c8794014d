//! Compiler options.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// How the script makes the device repaint after memory writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedrawTrigger {
    /// Hold the stylus down every step, sliding it sideways so each step
    /// registers as a new touch.
    #[default]
    ContinuousSlide,
    /// Alternate a stylus release with a press, so the press lands every
    /// other step.
    PulseThenTouch,
}

/// Timing and redraw settings for the generated script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Playback steps showing noise before the first video frame.
    pub settle_in_frames: u64,
    /// Device steps per source video frame.
    pub speed_divisor: u64,
    /// Fill the screen with noise during the settle-in window.
    pub noise: bool,
    /// Keep the two bottom-right cells one color behind so the redraw
    /// touch lands them on the right value.
    pub backbuffer_correction: bool,
    pub redraw_trigger: RedrawTrigger,
    /// Phase counter wraps to 0 when it reaches this value.
    pub phase_period: u32,
    /// Phase counter increment per touch. Also the stylus slide in pixels.
    pub phase_step: u32,
    /// Print a line on the device console when a frame plays.
    pub log_frames: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            settle_in_frames: 30,
            speed_divisor: 2,
            noise: true,
            backbuffer_correction: true,
            redraw_trigger: RedrawTrigger::ContinuousSlide,
            phase_period: 16,
            phase_step: 4,
            log_frames: true,
        }
    }
}

impl CompilerOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speed_divisor == 0 {
            return Err(ConfigError::InvalidSpeedDivisor);
        }
        // The phase must visit both halves of its period and step evenly.
        let (period, step) = (self.phase_period, self.phase_step);
        if step == 0 || period % 2 != 0 || period % step != 0 || step > period / 2 {
            return Err(ConfigError::InvalidPhase { period, step });
        }
        Ok(())
    }

    /// Phase value at which correction switches to the last cell.
    #[inline]
    pub fn phase_midpoint(&self) -> u32 {
        self.phase_period / 2
    }

    /// Phase after one advance from `phase`.
    #[inline]
    pub fn next_phase(&self, phase: u32) -> u32 {
        let next = phase + self.phase_step;
        if next >= self.phase_period {
            0
        } else {
            next
        }
    }

    /// Every phase value the counter takes.
    pub fn phases(&self) -> impl Iterator<Item = u32> {
        (0..self.phase_period).step_by(self.phase_step.max(1) as usize)
    }
}
