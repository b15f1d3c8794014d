//! Destinations for preview images.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use super::PreviewError;

/// Trait for preview image destinations.
pub trait ImageSink {
    /// Stores the preview for source frame `index`.
    fn save(&mut self, index: u64, image: &RgbaImage) -> Result<(), PreviewError>;
}

/// Writes `{dir}/{index:04}.png`.
#[derive(Debug, Clone)]
pub struct PngDirSink {
    dir: PathBuf,
}

impl PngDirSink {
    /// Creates the sink, creating `dir` if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, PreviewError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| PreviewError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{index:04}.png"))
    }
}

impl ImageSink for PngDirSink {
    fn save(&mut self, index: u64, image: &RgbaImage) -> Result<(), PreviewError> {
        let path = self.path_for(index);
        image.save(&path).map_err(|source| PreviewError::Save { path, source })
    }
}
