// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Geometry checks performed once, when a texture is acquired.

Non-power-of-two textures may only be edge-clamped and may not be mipmapped.  Power-of-two
textures accept every filter and wrap combination.
*/

use crate::bindings::sampler::{MinifyFilter, SamplingOptions, Wrap};
use crate::images::loader::LoadError;

/// `n` is `2^k` for some `k >= 0`.  Zero is not a power of two.
pub const fn is_power_of_two(n: u32) -> bool {
    n > 0 && (n & (n - 1)) == 0
}

/// Whether a `width`×`height` texture can be sampled with the given filter and wrap modes.
pub fn validate(
    width: u32,
    height: u32,
    minify: MinifyFilter,
    horizontal: Wrap,
    vertical: Wrap,
) -> bool {
    let both_pow2 = is_power_of_two(width) && is_power_of_two(height);
    both_pow2
        || (!minify.is_mipmapped() && horizontal == Wrap::ClampToEdge && vertical == Wrap::ClampToEdge)
}

/// [validate] against a full option set, failing with [LoadError::SizeInvalid].
pub fn check(width: u32, height: u32, options: &SamplingOptions) -> Result<(), LoadError> {
    if validate(
        width,
        height,
        options.minify,
        options.wrap_horizontal,
        options.wrap_vertical,
    ) {
        Ok(())
    } else {
        logwise::warn_sync!(
            "Rejecting {width}x{height} texture for sampling options {options}",
            width = width,
            height = height,
            options = logwise::privacy::LogIt(options)
        );
        Err(LoadError::SizeInvalid { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIFY: [MinifyFilter; 6] = [
        MinifyFilter::Nearest,
        MinifyFilter::Linear,
        MinifyFilter::NearestMipmapNearest,
        MinifyFilter::LinearMipmapNearest,
        MinifyFilter::NearestMipmapLinear,
        MinifyFilter::LinearMipmapLinear,
    ];
    const WRAP: [Wrap; 3] = [Wrap::Repeat, Wrap::ClampToEdge, Wrap::MirroredRepeat];

    #[test]
    fn powers_of_two() {
        assert!(!is_power_of_two(0));
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(2));
        assert!(!is_power_of_two(3));
        assert!(is_power_of_two(1 << 31));
        assert!(!is_power_of_two(300));
        assert!(!is_power_of_two(u32::MAX));
    }

    #[test]
    fn pow2_accepts_everything() {
        for (w, h) in [(1, 1), (256, 256), (512, 2), (1, 4096)] {
            for minify in MINIFY {
                for horizontal in WRAP {
                    for vertical in WRAP {
                        assert!(validate(w, h, minify, horizontal, vertical));
                    }
                }
            }
        }
    }

    #[test]
    fn npot_needs_clamp_and_no_mipmaps() {
        for (w, h) in [(300, 200), (256, 200), (3, 4), (0, 0)] {
            for minify in MINIFY {
                for horizontal in WRAP {
                    for vertical in WRAP {
                        let expected = !minify.is_mipmapped()
                            && horizontal == Wrap::ClampToEdge
                            && vertical == Wrap::ClampToEdge;
                        assert_eq!(validate(w, h, minify, horizontal, vertical), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn check_reports_dimensions() {
        assert_eq!(
            check(300, 200, &SamplingOptions::DEFAULT),
            Err(LoadError::SizeInvalid {
                width: 300,
                height: 200
            })
        );
        assert_eq!(check(300, 200, &SamplingOptions::NON_POWER_OF_TWO), Ok(()));
        assert_eq!(check(256, 256, &SamplingOptions::DEFAULT), Ok(()));
    }
}
