//! Control program synthesis.
//!
//! Turns a [`DiffMap`](crate::diff::DiffMap) into a program for the
//! target's frame-stepped scripting interface. The device only repaints
//! after a touch event, so every step also fires a synthetic touch on the
//! bottom-right cells and keeps those two cells one color behind to
//! absorb it.

mod compiler;
mod lua;
mod options;
mod program;

pub use compiler::{CompileError, Compiler};
pub use lua::{LuaEmitter, ScriptEmitter};
pub use options::{CompilerOptions, RedrawTrigger};
pub use program::{
    backbuffer_value, touched_value, ControlProgram, Corner, Dispatch, FrameUnit, MemoryWrite,
    NoiseUnit, COLOR_BASE,
};
