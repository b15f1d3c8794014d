//! Fixed display palette and nearest-color lookup.

use image::imageops::ColorMap;
use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Number of colors the target can display.
pub const PALETTE_SIZE: usize = 4;

/// Ordered sequence of RGB colors. A color is identified by its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Default for Palette {
    /// The handheld's four greens, lightest first.
    fn default() -> Self {
        Self {
            colors: vec![[112, 176, 112], [80, 128, 80], [56, 80, 40], [16, 40, 24]],
        }
    }
}

impl Palette {
    /// Creates a palette, rejecting anything but exactly [`PALETTE_SIZE`] entries.
    pub fn new(colors: Vec<[u8; 3]>) -> Result<Self, ConfigError> {
        let palette = Self { colors };
        palette.validate()?;
        Ok(palette)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.colors.len() != PALETTE_SIZE {
            return Err(ConfigError::InvalidPalette(self.colors.len()));
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns the RGB value of `index`, or `None` outside the palette.
    #[inline]
    pub fn color(&self, index: u8) -> Option<[u8; 3]> {
        self.colors.get(index as usize).copied()
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    /// Maps an RGB value to the index of the closest palette entry.
    ///
    /// Distance is squared Euclidean in RGB space. Ties resolve to the
    /// lowest index, so the mapping is a pure function of the input.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (i, color) in self.colors.iter().enumerate() {
            let distance = squared_distance(rgb, *color);
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best as u8
    }
}

impl ColorMap for Palette {
    type Color = Rgb<u8>;

    #[inline]
    fn index_of(&self, color: &Rgb<u8>) -> usize {
        usize::from(self.nearest(color.0))
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        self.colors.get(index).map(|&c| Rgb(c))
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        if let Some(mapped) = self.lookup(self.index_of(color)) {
            *color = mapped;
        }
    }
}

#[inline]
fn squared_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| {
            let d = u32::from(p.abs_diff(q));
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_entries_map_to_themselves() {
        let palette = Palette::default();
        for (i, color) in palette.colors().iter().enumerate() {
            assert_eq!(palette.nearest(*color), i as u8);
        }
    }

    #[test]
    fn test_extremes_map_to_lightest_and_darkest() {
        let palette = Palette::default();
        assert_eq!(palette.nearest([255, 255, 255]), 0);
        assert_eq!(palette.nearest([0, 0, 0]), 3);
    }

    #[test]
    fn test_tie_resolves_to_lowest_index() {
        let palette = Palette::new(vec![[0, 0, 0], [10, 0, 0], [200, 0, 0], [255, 0, 0]]).unwrap();
        assert_eq!(palette.nearest([5, 0, 0]), 0);
    }

    #[test]
    fn test_color_map_indexes_image() {
        let palette = Palette::default();
        let image = image::RgbImage::from_fn(4, 1, |x, _| Rgb([x as u8 * 60, 100, 60]));

        let indexed = image::imageops::index_colors(&image, &palette);
        for (x, pixel) in image.pixels().enumerate() {
            assert_eq!(indexed.get_pixel(x as u32, 0)[0], palette.nearest(pixel.0));
        }

        let mut color = Rgb([250, 250, 250]);
        palette.map_color(&mut color);
        assert_eq!(color, Rgb([112, 176, 112]));
        assert_eq!(palette.lookup(3), Some(Rgb([16, 40, 24])));
        assert_eq!(palette.lookup(4), None);
    }

    #[test]
    fn test_wrong_size_rejected() {
        assert!(matches!(
            Palette::new(vec![[0, 0, 0]; 3]),
            Err(ConfigError::InvalidPalette(3))
        ));
    }
}
