//! Target device profile.
//!
//! Everything the pipeline knows about the device lives in one immutable
//! value that is passed explicitly to the reducer, the compiler and the
//! simulator. Several profiles can coexist in one process.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::quantize::Palette;

/// Framebuffer geometry, palette and touch-input layout of the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetProfile {
    /// Screen width in cells.
    pub width: u32,
    /// Screen height in cells.
    pub height: u32,
    /// Side length of one cell in device pixels.
    pub cell_size_px: u32,
    /// Device-pixel position of the top-left cell on the touch surface.
    pub screen_offset_px: [u32; 2],
    /// Memory address of cell (0, 0). Cells are laid out row-major.
    pub base_address: u32,
    /// Ordered display palette.
    pub palette: Palette,
    /// Touch position for phase 0; the x coordinate slides with the phase.
    pub touch_origin_px: [u32; 2],
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            width: 24,
            height: 20,
            cell_size_px: 8,
            screen_offset_px: [16, 16],
            base_address: 0x0238_F9E8,
            palette: Palette::default(),
            touch_origin_px: [192, 168],
        }
    }
}

impl TargetProfile {
    /// Creates the default profile with a different grid size.
    pub fn with_grid(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates geometry and address arithmetic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The redraw correction needs two cells on the bottom row.
        if self.width < 2 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.cell_size_px == 0 {
            return Err(ConfigError::InvalidCellSize);
        }
        self.palette.validate()?;
        let last = self.cell_count() as u64 - 1;
        if u64::from(self.base_address) + last > u64::from(u32::MAX) {
            return Err(ConfigError::AddressOverflow {
                base: self.base_address,
                cells: self.cell_count(),
            });
        }
        Ok(())
    }

    /// Total number of cells on screen.
    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Screen size in device pixels.
    pub fn size_px(&self) -> (u32, u32) {
        (
            self.width * self.cell_size_px,
            self.height * self.cell_size_px,
        )
    }

    /// Memory address of cell `(x, y)`.
    #[inline]
    pub fn cell_address(&self, x: u32, y: u32) -> u32 {
        self.base_address + y * self.width + x
    }

    /// Returns the cell under a device-pixel touch position, if any.
    pub fn cell_at_px(&self, px: u32, py: u32) -> Option<(u32, u32)> {
        let [ox, oy] = self.screen_offset_px;
        let x = px.checked_sub(ox)? / self.cell_size_px;
        let y = py.checked_sub(oy)? / self.cell_size_px;
        (x < self.width && y < self.height).then_some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_valid() {
        let profile = TargetProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.size_px(), (192, 160));
    }

    #[test]
    fn test_cell_address_is_row_major() {
        let profile = TargetProfile::default();
        assert_eq!(profile.cell_address(0, 0), 0x0238_F9E8);
        assert_eq!(profile.cell_address(1, 0), 0x0238_F9E9);
        assert_eq!(profile.cell_address(0, 1), 0x0238_F9E8 + 24);
        assert_eq!(profile.cell_address(23, 19), 0x0238_F9E8 + 479);
    }

    #[test]
    fn test_narrow_grid_invalid() {
        let profile = TargetProfile::with_grid(1, 20);
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_address_overflow_rejected() {
        let profile = TargetProfile {
            base_address: u32::MAX - 10,
            ..Default::default()
        };
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::AddressOverflow { .. })
        ));
    }

    #[test]
    fn test_touch_lands_on_bottom_right_cells() {
        let profile = TargetProfile::default();
        assert_eq!(profile.cell_at_px(192, 168), Some((22, 19)));
        assert_eq!(profile.cell_at_px(200, 168), Some((23, 19)));
        assert_eq!(profile.cell_at_px(4, 4), None);
        assert_eq!(profile.cell_at_px(16 + 192, 20), None);
    }
}
