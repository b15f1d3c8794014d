//! Preview image rendering.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::diff::QuantizedFrame;
use crate::quantize::Palette;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn cell_color(palette: &Palette, cell: u8, alpha: u8) -> Rgba<u8> {
    match palette.color(cell) {
        Some([r, g, b]) => Rgba([r, g, b, alpha]),
        None => TRANSPARENT,
    }
}

/// Renders a quantized frame at one pixel per cell. Blank cells are transparent.
pub fn frame_image(frame: &QuantizedFrame, palette: &Palette) -> RgbaImage {
    RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
        cell_color(palette, frame.get(x, y), u8::MAX)
    })
}

/// Renders `next` with changed cells opaque and unchanged cells faded to
/// `opacity`.
pub fn diff_overlay(
    prev: &QuantizedFrame,
    next: &QuantizedFrame,
    palette: &Palette,
    opacity: f32,
) -> RgbaImage {
    let faded = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(next.width(), next.height(), |x, y| {
        let cell = next.get(x, y);
        let alpha = if prev.get(x, y) != cell { u8::MAX } else { faded };
        cell_color(palette, cell, alpha)
    })
}

/// Places `top` above `bottom`.
pub fn stack(top: &RgbaImage, bottom: &RgbaImage) -> RgbaImage {
    let width = top.width().max(bottom.width());
    let mut out = RgbaImage::from_pixel(width, top.height() + bottom.height(), TRANSPARENT);
    imageops::replace(&mut out, top, 0, 0);
    imageops::replace(&mut out, bottom, 0, i64::from(top.height()));
    out
}

/// Nearest-neighbor upscale by an integer factor.
pub fn upscale(image: &RgbaImage, factor: u32) -> RgbaImage {
    if factor <= 1 {
        return image.clone();
    }
    imageops::resize(
        image,
        image.width() * factor,
        image.height() * factor,
        FilterType::Nearest,
    )
}
