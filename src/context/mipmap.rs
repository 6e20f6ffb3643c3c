// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! CPU mipmap generation.

Each level is a 2×2 box filter of the one above it.  Odd or unit dimensions reuse the edge
texel, so the chain can be built for any size even though only power-of-two textures are
mipmapped in practice.
*/

use crate::images::source::BYTES_PER_PIXEL;

/// Size of `level` for a `width`×`height` base.
pub const fn level_size(width: u32, height: u32, level: u32) -> (u32, u32) {
    let w = width >> level;
    let h = height >> level;
    (if w == 0 { 1 } else { w }, if h == 0 { 1 } else { h })
}

/// Halves an RGBA8 image.
pub fn downsample(pixels: &[u8], width: u32, height: u32) -> (Vec<u8>, u32, u32) {
    let (out_width, out_height) = level_size(width, height, 1);
    let mut out = Vec::with_capacity(out_width as usize * out_height as usize * BYTES_PER_PIXEL);
    for y in 0..out_height {
        for x in 0..out_width {
            let (bx, by) = (x * 2, y * 2);
            let samples = [
                texel(pixels, width, height, bx, by),
                texel(pixels, width, height, bx + 1, by),
                texel(pixels, width, height, bx, by + 1),
                texel(pixels, width, height, bx + 1, by + 1),
            ];
            for channel in 0..BYTES_PER_PIXEL {
                let sum: u32 = samples.iter().map(|s| s[channel] as u32).sum();
                //round to nearest
                out.push(((sum + 2) / 4) as u8);
            }
        }
    }
    (out, out_width, out_height)
}

fn texel(pixels: &[u8], width: u32, height: u32, x: u32, y: u32) -> &[u8] {
    let x = x.min(width - 1) as usize;
    let y = y.min(height - 1) as usize;
    let offset = (y * width as usize + x) * BYTES_PER_PIXEL;
    &pixels[offset..offset + BYTES_PER_PIXEL]
}

/// Levels `1..level_count` built from `base`.
pub fn chain(base: &[u8], width: u32, height: u32, level_count: u32) -> Vec<Vec<u8>> {
    let mut levels = Vec::with_capacity(level_count.saturating_sub(1) as usize);
    let mut current = (base.to_vec(), width, height);
    for _ in 1..level_count {
        let next = downsample(&current.0, current.1, current.2);
        levels.push(next.0.clone());
        current = next;
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(level_size(256, 64, 0), (256, 64));
        assert_eq!(level_size(256, 64, 3), (32, 8));
        assert_eq!(level_size(256, 64, 7), (2, 1));
        assert_eq!(level_size(256, 64, 8), (1, 1));
    }

    #[test]
    fn box_filter() {
        #[rustfmt::skip]
        let base = [
            0, 0, 0, 255,    100, 100, 100, 255,
            200, 200, 200, 255,  100, 100, 100, 255,
        ];
        let (out, w, h) = downsample(&base, 2, 2);
        assert_eq!((w, h), (1, 1));
        assert_eq!(out, vec![100, 100, 100, 255]);
    }

    #[test]
    fn full_chain() {
        let base = vec![255u8; 8 * 4 * 4];
        let levels = chain(&base, 8, 4, 4);
        let sizes: Vec<usize> = levels.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4 * 2 * 4, 2 * 1 * 4, 1 * 1 * 4]);
        assert!(levels.iter().flatten().all(|&b| b == 255));
    }
}
