//! Area-averaging resampler.
//!
//! Each destination pixel is the coverage-weighted mean of the source
//! pixels under it. Weights are exact integers: along one axis source
//! pixel `s` spans `[s*dst, (s+1)*dst)` and destination pixel `d` spans
//! `[d*src, (d+1)*src)`, so overlaps never need floating point and the
//! result is bit-identical across runs and platforms.

/// One source pixel's contribution to a destination pixel along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tap {
    source: usize,
    weight: u64,
}

/// Per-destination taps for one axis. Weights of each entry sum to `src`.
fn axis_taps(src: u32, dst: u32) -> Vec<Vec<Tap>> {
    let (src, dst) = (u64::from(src), u64::from(dst));
    (0..dst)
        .map(|d| {
            let lo = d * src;
            let hi = (d + 1) * src;
            let first = lo / dst;
            let last = (hi - 1) / dst;
            (first..=last)
                .map(|s| {
                    let start = (s * dst).max(lo);
                    let end = ((s + 1) * dst).min(hi);
                    Tap {
                        source: s as usize,
                        weight: end - start,
                    }
                })
                .collect()
        })
        .collect()
}

/// Resamples a packed RGB24 image to `dst_width` x `dst_height`.
///
/// Callers must pass a buffer of `src_width * src_height * 3` bytes and
/// non-zero dimensions.
pub fn resample_area(
    pixels: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Vec<[u8; 3]> {
    debug_assert_eq!(pixels.len(), src_width as usize * src_height as usize * 3);

    let x_taps = axis_taps(src_width, dst_width);
    let y_taps = axis_taps(src_height, dst_height);
    let total = u64::from(src_width) * u64::from(src_height);
    let stride = src_width as usize * 3;

    let mut out = Vec::with_capacity(dst_width as usize * dst_height as usize);
    for ys in &y_taps {
        for xs in &x_taps {
            let mut acc = [0u64; 3];
            for ty in ys {
                let row = &pixels[ty.source * stride..(ty.source + 1) * stride];
                for tx in xs {
                    let w = ty.weight * tx.weight;
                    let px = &row[tx.source * 3..tx.source * 3 + 3];
                    for (a, &c) in acc.iter_mut().zip(px) {
                        *a += w * u64::from(c);
                    }
                }
            }
            // Round half up.
            out.push(acc.map(|a| ((a + total / 2) / total) as u8));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_weights_sum_to_source_length() {
        for (src, dst) in [(7, 3), (640, 24), (3, 7), (5, 5)] {
            for taps in axis_taps(src, dst) {
                assert_eq!(taps.iter().map(|t| t.weight).sum::<u64>(), u64::from(src));
            }
        }
    }

    #[test]
    fn test_integer_downscale_averages_blocks() {
        // 4x2 -> 2x1: each output averages a 2x2 block.
        #[rustfmt::skip]
        let pixels = [
            0, 0, 0,    100, 100, 100,   10, 20, 30,   10, 20, 30,
            100, 100, 100, 100, 100, 100, 10, 20, 30,  10, 20, 30,
        ];
        let out = resample_area(&pixels, 4, 2, 2, 1);
        assert_eq!(out, vec![[75, 75, 75], [10, 20, 30]]);
    }

    #[test]
    fn test_fractional_coverage() {
        // 3x1 -> 2x1: left output covers pixel 0 fully and half of pixel 1.
        let pixels = [0, 0, 0, 90, 90, 90, 180, 180, 180];
        let out = resample_area(&pixels, 3, 1, 2, 1);
        assert_eq!(out, vec![[30, 30, 30], [150, 150, 150]]);
    }

    #[test]
    fn test_identity_size() {
        let pixels: Vec<u8> = (0..2 * 2 * 3).map(|i| i as u8 * 10).collect();
        let out = resample_area(&pixels, 2, 2, 2, 2);
        let flat: Vec<u8> = out.into_iter().flatten().collect();
        assert_eq!(flat, pixels);
    }
}
