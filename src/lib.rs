//! Poketch Video Library
//!
//! Compiles a video into a frame-stepped control program that replays it
//! on a 24x20, 4-color handheld display by writing framebuffer memory
//! directly and forcing repaints with synthetic stylus touches.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → quantize → diff → compile → script text
//!                        ↓        ↓
//!                     preview  playback (simulation)
//! ```
//!
//! # Design Principles
//!
//! - **Deterministic**: quantization has no dithering, so unchanged
//!   regions never produce spurious writes
//! - **Sparse**: only frames that change something get a unit in the program
//! - **Explicit device profile**: grid, palette and addresses are a value
//!   threaded through every stage, never process-wide state
//! - **No partial output**: the script is written only once fully assembled
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//!
//! use poketch_video::{
//!     capture::FfmpegSource,
//!     compile::{Compiler, CompilerOptions, LuaEmitter, ScriptEmitter},
//!     config::TargetProfile,
//!     pipeline::Pipeline,
//! };
//!
//! let profile = TargetProfile::default();
//! let mut source = FfmpegSource::new("input.mp4");
//!
//! let summary = Pipeline::new(&profile)
//!     .run(&mut source, &mut (), &AtomicBool::new(false))
//!     .unwrap();
//!
//! let program = Compiler::new(profile, CompilerOptions::default())
//!     .compile(&summary.diffs)
//!     .unwrap();
//! std::fs::write("video.lua", LuaEmitter::new().emit(&program)).unwrap();
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod compile;
pub mod config;
pub mod diff;
pub mod pipeline;
pub mod playback;
pub mod preview;
pub mod quantize;

// Re-export commonly used types at crate root
pub use capture::{FfmpegSource, MockSource, RawFrame, VideoSource};
pub use compile::{Compiler, CompilerOptions, ControlProgram, LuaEmitter, RedrawTrigger, ScriptEmitter};
pub use config::{FileConfig, TargetProfile};
pub use diff::{DiffAccumulator, DiffMap, PixelChange, QuantizedFrame};
pub use pipeline::{Pipeline, PipelineError, ProgressSink, RunSummary};
pub use playback::Simulator;
pub use quantize::{FrameReducer, Palette};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
