//! Preview export of quantized frames and their diffs.
//!
//! Previews are observational only. Whether a failed write aborts the run
//! or is logged and skipped is an explicit [`FailurePolicy`].

mod render;
mod sink;

pub use render::{diff_overlay, frame_image, stack, upscale};
pub use sink::{ImageSink, PngDirSink};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::diff::QuantizedFrame;
use crate::quantize::Palette;

/// Errors that can occur while exporting previews.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to create preview directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to save preview '{path}': {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Which preview images to write per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// No previews.
    #[default]
    None,
    /// The quantized frame.
    Frames,
    /// The diff overlay against the previous frame.
    Diff,
    /// The quantized frame stacked above the diff overlay.
    Both,
}

/// What to do when a preview cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the run.
    #[default]
    Abort,
    /// Log a warning and continue with the next frame.
    Skip,
}

/// Preview output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub output: PreviewMode,
    /// Directory receiving `{index:04}.png` files.
    pub dir: PathBuf,
    /// Nearest-neighbor upscale factor.
    pub upscale: u32,
    /// Alpha of unchanged cells in the diff overlay, in `[0, 1]`.
    pub opacity: f32,
    pub on_failure: FailurePolicy,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            output: PreviewMode::None,
            dir: PathBuf::from("frames"),
            upscale: 8,
            opacity: 0.25,
            on_failure: FailurePolicy::Abort,
        }
    }
}

impl PreviewConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upscale == 0 {
            return Err(ConfigError::InvalidUpscale);
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::InvalidOpacity(self.opacity));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.output != PreviewMode::None
    }
}

/// Renders and stores one preview per processed frame.
pub struct PreviewExporter {
    config: PreviewConfig,
    palette: Palette,
    sink: Box<dyn ImageSink>,
    skipped: u64,
}

impl PreviewExporter {
    pub fn new(config: PreviewConfig, palette: Palette, sink: Box<dyn ImageSink>) -> Self {
        Self {
            config,
            palette,
            sink,
            skipped: 0,
        }
    }

    /// Builds an exporter writing PNGs to the configured directory, or
    /// `None` when previews are disabled.
    pub fn from_config(config: &PreviewConfig, palette: &Palette) -> Result<Option<Self>, PreviewError> {
        if !config.is_enabled() {
            return Ok(None);
        }
        let sink = PngDirSink::create(&config.dir)?;
        tracing::info!(dir = %config.dir.display(), mode = ?config.output, "Exporting previews");
        Ok(Some(Self::new(config.clone(), palette.clone(), Box::new(sink))))
    }

    /// Number of previews dropped under [`FailurePolicy::Skip`].
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Renders the preview for the transition `prev -> next` at `index`
    /// and hands it to the sink, applying the failure policy.
    pub fn export(
        &mut self,
        index: u64,
        prev: &QuantizedFrame,
        next: &QuantizedFrame,
    ) -> Result<(), PreviewError> {
        let image = match self.config.output {
            PreviewMode::None => return Ok(()),
            PreviewMode::Frames => frame_image(next, &self.palette),
            PreviewMode::Diff => diff_overlay(prev, next, &self.palette, self.config.opacity),
            PreviewMode::Both => stack(
                &frame_image(next, &self.palette),
                &diff_overlay(prev, next, &self.palette, self.config.opacity),
            ),
        };
        let image = upscale(&image, self.config.upscale);

        match self.sink.save(index, &image) {
            Ok(()) => Ok(()),
            Err(e) if self.config.on_failure == FailurePolicy::Skip => {
                self.skipped += 1;
                tracing::warn!(frame = index, error = %e, "Skipping preview");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
