//! Palette-indexed frame on the device grid.

use super::DiffError;

/// Cell value meaning "nothing drawn yet". Never a valid palette index.
pub const BLANK: u8 = u8::MAX;

/// A frame reduced to the device grid, one palette index per cell.
#[derive(Clone, PartialEq, Eq)]
pub struct QuantizedFrame {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl QuantizedFrame {
    /// Creates a frame from row-major cells.
    pub fn new(width: u32, height: u32, cells: Vec<u8>) -> Result<Self, DiffError> {
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(DiffError::CellCount {
                expected,
                got: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// The device state before the first frame: every cell [`BLANK`].
    pub fn blank(width: u32, height: u32) -> Self {
        Self::filled(width, height, BLANK)
    }

    /// A frame where every cell holds `color`.
    pub fn filled(width: u32, height: u32, color: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![color; width as usize * height as usize],
        }
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
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Returns one row of cells.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: u8) {
        self.cells[y as usize * self.width as usize + x as usize] = color;
    }

    /// True if no cell has been drawn.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&c| c == BLANK)
    }
}

impl std::fmt::Debug for QuantizedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("QuantizedFrame");
        s.field("width", &self.width).field("height", &self.height);
        if self.cells.len() <= 64 {
            s.field("cells", &self.cells);
        }
        s.finish()
    }
}
