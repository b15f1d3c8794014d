//! Step-by-step model of the target device running a control program.
//!
//! The model covers what the program relies on: framebuffer cells hold
//! 1-based colors (0 = never painted), a touch registers only when the
//! stylus moved or was released since the last touch, and a registered
//! touch advances the touched cell by one color. Noise comes from a
//! seeded ChaCha generator so runs are reproducible.

use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};

use crate::compile::{
    touched_value, ControlProgram, Corner, Dispatch, FrameUnit, RedrawTrigger, COLOR_BASE,
};
use crate::diff::{QuantizedFrame, BLANK};

/// What the dispatch stage did during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Noise,
    /// The unit for this source frame ran.
    Frame(u64),
    Idle,
}

/// A stylus press issued during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    /// Device-pixel position.
    pub position: (u32, u32),
    /// Cell under the stylus, if on screen.
    pub cell: Option<(u32, u32)>,
    /// Whether the device accepted it as a new touch.
    pub registered: bool,
}

/// Outcome of one simulated step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub step: u64,
    pub relative: u64,
    pub action: StepAction,
    pub touch: Option<TouchEvent>,
}

/// Executes a [`ControlProgram`] against a modeled framebuffer.
pub struct Simulator<'p> {
    program: &'p ControlProgram,
    /// Framebuffer, one memory value per cell.
    memory: Vec<u8>,
    /// Held correction values, indexed by [`Corner::slot`].
    held: [u8; 2],
    phase: u32,
    pressed: bool,
    last_relative: Option<u64>,
    last_touch: Option<(u32, u32)>,
    steps: u64,
    played: Vec<u64>,
    rng: ChaCha8Rng,
}

impl<'p> Simulator<'p> {
    /// Creates a simulator with a powered-on, never-painted screen.
    pub fn new(program: &'p ControlProgram, seed: u64) -> Self {
        Self {
            program,
            memory: vec![0; program.profile().cell_count()],
            held: [0; 2],
            phase: 0,
            pressed: false,
            last_relative: None,
            last_touch: None,
            steps: 0,
            played: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Runs one step of the program's main loop.
    pub fn step(&mut self) -> StepReport {
        let program = self.program;
        let relative = program.relative_index(self.steps);

        let action = match program.dispatch(relative) {
            Dispatch::Noise => {
                self.run_noise();
                StepAction::Noise
            }
            Dispatch::Frame(unit) if self.last_relative != Some(relative) => {
                self.run_unit(unit);
                StepAction::Frame(unit.frame)
            }
            _ => StepAction::Idle,
        };
        self.last_relative = Some(relative);

        let touch = match program.redraw_trigger() {
            RedrawTrigger::ContinuousSlide => Some(self.press()),
            RedrawTrigger::PulseThenTouch => {
                self.pressed = !self.pressed;
                if self.pressed {
                    Some(self.press())
                } else {
                    self.last_touch = None;
                    None
                }
            }
        };

        let report = StepReport {
            step: self.steps,
            relative,
            action,
            touch,
        };
        self.steps += 1;
        report
    }

    /// Runs `steps` steps.
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Runs until every frame unit has been dispatched.
    pub fn run_to_end(&mut self) {
        let remaining = self.program.playback_steps().saturating_sub(self.steps);
        self.run(remaining);
    }

    fn run_noise(&mut self) {
        let max = self.program.noise().map_or(1, |noise| noise.max_value);
        for i in 0..self.memory.len() {
            let value = self.random_value(max);
            self.memory[i] = value;
        }
        if self.program.options().backbuffer_correction {
            for corner in Corner::ALL {
                self.held[corner.slot()] = self.random_value(max);
            }
        }
    }

    fn run_unit(&mut self, unit: &FrameUnit) {
        let width = self.program.profile().width as usize;
        for write in &unit.writes {
            self.memory[write.y as usize * width + write.x as usize] = write.value;
        }
        for (corner, value) in &unit.corrections {
            self.held[corner.slot()] = *value;
        }
        self.played.push(unit.frame);
        tracing::trace!(frame = unit.frame, writes = unit.writes.len(), "Played frame");
    }

    fn press(&mut self) -> TouchEvent {
        let program = self.program;
        let profile = program.profile();
        let options = program.options();
        self.phase = options.next_phase(self.phase);

        if options.backbuffer_correction {
            let corner = program.corrected_corner(self.phase);
            let (x, y) = corner.cell(profile.width, profile.height);
            self.set_cell(x, y, self.held[corner.slot()]);
        }

        let position = program.touch_position(self.phase);
        let registered = self.last_touch != Some(position);
        self.last_touch = Some(position);

        let cell = profile.cell_at_px(position.0, position.1);
        if let (true, Some((x, y))) = (registered, cell) {
            let value = touched_value(self.cell(x, y), profile.palette.len());
            self.set_cell(x, y, value);
        }

        TouchEvent {
            position,
            cell,
            registered,
        }
    }

    /// Uniform value in `1..=max`.
    fn random_value(&mut self, max: u8) -> u8 {
        COLOR_BASE + (self.rng.next_u32() % u32::from(max.max(1))) as u8
    }

    #[inline]
    fn set_cell(&mut self, x: u32, y: u32, value: u8) {
        let width = self.program.profile().width as usize;
        self.memory[y as usize * width + x as usize] = value;
    }

    /// Memory value of cell `(x, y)`.
    #[inline]
    pub fn cell(&self, x: u32, y: u32) -> u8 {
        let width = self.program.profile().width as usize;
        self.memory[y as usize * width + x as usize]
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Correction value currently held for `corner`.
    pub fn held(&self, corner: Corner) -> u8 {
        self.held[corner.slot()]
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Source frames played, in order.
    pub fn frames_played(&self) -> &[u64] {
        &self.played
    }

    /// The displayed screen as palette indices. Unpainted cells are [`BLANK`].
    pub fn screen(&self) -> QuantizedFrame {
        let profile = self.program.profile();
        let cells = self
            .memory
            .iter()
            .map(|&v| if v == 0 { BLANK } else { v - COLOR_BASE })
            .collect();
        QuantizedFrame::new(profile.width, profile.height, cells)
            .unwrap_or_else(|_| QuantizedFrame::blank(profile.width, profile.height))
    }
}
