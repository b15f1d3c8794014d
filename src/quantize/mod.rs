//! Frame reduction to the device grid and palette.
//!
//! A raw frame is area-averaged down to one color per cell, then each
//! cell is snapped to the nearest palette entry. There is no dithering:
//! unchanged regions of consecutive frames must quantize identically or
//! the diff stage would record spurious changes.

mod area;
mod palette;
mod parallel;

pub use area::resample_area;
pub use palette::{Palette, PALETTE_SIZE};
pub use parallel::{ParallelReducer, ThreadingConfig};

use image::imageops::ColorMap;
use image::Rgb;
use thiserror::Error;

use crate::capture::RawFrame;
use crate::config::TargetProfile;
use crate::diff::{DiffError, QuantizedFrame};

/// Errors raised while reducing a frame.
#[derive(Debug, Error)]
pub enum QuantizeError {
    #[error("frame {index} has no usable pixel data ({width}x{height}, {bytes} bytes)")]
    InvalidFrame {
        index: u64,
        width: u32,
        height: u32,
        bytes: usize,
    },
    #[error(transparent)]
    Grid(#[from] DiffError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Reduces raw frames to [`QuantizedFrame`]s for one target profile.
#[derive(Debug, Clone)]
pub struct FrameReducer {
    width: u32,
    height: u32,
    palette: Palette,
}

impl FrameReducer {
    pub fn new(profile: &TargetProfile) -> Self {
        Self {
            width: profile.width,
            height: profile.height,
            palette: profile.palette.clone(),
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Grid size of the produced frames.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resizes `frame` to the grid with area averaging and maps each cell
    /// to its nearest palette index.
    pub fn reduce(&self, frame: &RawFrame) -> Result<QuantizedFrame, QuantizeError> {
        if !frame.is_valid() {
            return Err(QuantizeError::InvalidFrame {
                index: frame.index(),
                width: frame.width(),
                height: frame.height(),
                bytes: frame.pixels().len(),
            });
        }

        let cells = resample_area(
            frame.pixels(),
            frame.width(),
            frame.height(),
            self.width,
            self.height,
        )
        .into_iter()
        .map(|rgb| self.palette.index_of(&Rgb(rgb)) as u8)
        .collect();

        Ok(QuantizedFrame::new(self.width, self.height, cells)?)
    }
}
