//! Video input and frame handling.
//!
//! This module provides the raw frame type and sources that decode a
//! video into frames in presentation order. Decoding is delegated to
//! `ffmpeg`; nothing here interprets pixel content.

mod frame;
mod source;

pub use frame::RawFrame;
pub use source::{read_video_info, FfmpegSource, Frames, MockSource, SourceError, VideoInfo, VideoSource};
