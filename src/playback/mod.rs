//! Offline execution of compiled control programs.
//!
//! This module provides a deterministic model of the target device so
//! that dispatch timing and redraw correction can be checked without an
//! emulator.

mod simulator;

pub use simulator::{Simulator, StepAction, StepReport, TouchEvent};
