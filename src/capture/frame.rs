//! Raw decoded video frame.

use image::RgbImage;

/// A single decoded frame in packed RGB24 layout.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Packed RGB bytes, row-major, three bytes per pixel.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Zero-based position in the source video.
    index: u64,
}

impl RawFrame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            index,
        }
    }

    /// Wraps an `image` buffer.
    pub fn from_image(image: RgbImage, index: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
    }

    /// Creates a frame where every pixel has the same color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], index: u64) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(pixels, width, height, index)
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the frame is non-empty and the buffer matches its dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixel_count() > 0 && self.pixels.len() == self.pixel_count() * 3
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("index", &self.index)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
