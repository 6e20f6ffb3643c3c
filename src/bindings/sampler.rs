// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Sampling options applied to a texture when it is bound.

Magnification and minification filters are distinct types.  A texture can only be
magnified with [MagnifyFilter::Nearest] or [MagnifyFilter::Linear]; the mipmapped variants
only make sense when shrinking, so they exist only on [MinifyFilter].

```
use texture_acquire::bindings::sampler::{MinifyFilter, SamplingOptions, Wrap};

let options = SamplingOptions::DEFAULT;
assert!(options.is_mipmapped());
assert_eq!(options.wrap_horizontal, Wrap::Repeat);

let npot = SamplingOptions::NON_POWER_OF_TWO;
assert_eq!(npot.minify, MinifyFilter::Nearest);
assert!(!npot.is_mipmapped());
```
*/

/// Filter used when a texel covers more than one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagnifyFilter {
    Nearest,
    Linear,
}

/// Filter used when a pixel covers more than one texel.
///
/// The `*Mipmap*` variants require a mipmap chain.  The first word picks the filter within a
/// level, the last word picks the filter between levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinifyFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl MinifyFilter {
    /// Whether sampling with this filter reads from a mipmap chain.
    pub const fn is_mipmapped(self) -> bool {
        !matches!(self, MinifyFilter::Nearest | MinifyFilter::Linear)
    }
}

impl From<MagnifyFilter> for MinifyFilter {
    fn from(filter: MagnifyFilter) -> Self {
        match filter {
            MagnifyFilter::Nearest => MinifyFilter::Nearest,
            MagnifyFilter::Linear => MinifyFilter::Linear,
        }
    }
}

/// How coordinates outside `[0,1]` are resolved along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrap {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Sampler state and upload orientation for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplingOptions {
    pub magnify: MagnifyFilter,
    pub minify: MinifyFilter,
    pub wrap_horizontal: Wrap,
    pub wrap_vertical: Wrap,
    /// Flip rows on upload, so that the first row of the source lands at `v = 1`.
    pub flip_vertical: bool,
}

impl SamplingOptions {
    /// Linear magnification, trilinear-ish minification, repeating on both axes.
    ///
    /// Requires power-of-two dimensions.
    pub const DEFAULT: SamplingOptions = SamplingOptions {
        magnify: MagnifyFilter::Linear,
        minify: MinifyFilter::NearestMipmapLinear,
        wrap_horizontal: Wrap::Repeat,
        wrap_vertical: Wrap::Repeat,
        flip_vertical: true,
    };

    /// Options that accept any dimensions: no mipmaps, edge-clamped on both axes.
    pub const NON_POWER_OF_TWO: SamplingOptions = SamplingOptions {
        magnify: MagnifyFilter::Linear,
        minify: MinifyFilter::Nearest,
        wrap_horizontal: Wrap::ClampToEdge,
        wrap_vertical: Wrap::ClampToEdge,
        flip_vertical: true,
    };

    pub const fn is_mipmapped(&self) -> bool {
        self.minify.is_mipmapped()
    }

    /// Number of mip levels a texture of this size needs under these options.
    ///
    /// `floor(log2(max(width, height))) + 1` when mipmapped, otherwise 1.
    pub fn mip_level_count(&self, width: u32, height: u32) -> u32 {
        if self.is_mipmapped() {
            width.max(height).max(1).ilog2() + 1
        } else {
            1
        }
    }

    pub const fn with_magnify(mut self, magnify: MagnifyFilter) -> Self {
        self.magnify = magnify;
        self
    }

    pub const fn with_minify(mut self, minify: MinifyFilter) -> Self {
        self.minify = minify;
        self
    }

    pub const fn with_wrap(mut self, horizontal: Wrap, vertical: Wrap) -> Self {
        self.wrap_horizontal = horizontal;
        self.wrap_vertical = vertical;
        self
    }

    pub const fn with_flip_vertical(mut self, flip_vertical: bool) -> Self {
        self.flip_vertical = flip_vertical;
        self
    }
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mipmapped_filters() {
        assert!(!MinifyFilter::Nearest.is_mipmapped());
        assert!(!MinifyFilter::Linear.is_mipmapped());
        assert!(MinifyFilter::NearestMipmapNearest.is_mipmapped());
        assert!(MinifyFilter::LinearMipmapNearest.is_mipmapped());
        assert!(MinifyFilter::NearestMipmapLinear.is_mipmapped());
        assert!(MinifyFilter::LinearMipmapLinear.is_mipmapped());
    }

    #[test]
    fn mip_level_count() {
        let options = SamplingOptions::DEFAULT;
        assert_eq!(options.mip_level_count(256, 256), 9);
        assert_eq!(options.mip_level_count(512, 1), 10);
        assert_eq!(options.mip_level_count(1, 1), 1);
        assert_eq!(SamplingOptions::NON_POWER_OF_TWO.mip_level_count(300, 200), 1);
    }

    #[test]
    fn magnify_is_a_minify() {
        assert_eq!(MinifyFilter::from(MagnifyFilter::Linear), MinifyFilter::Linear);
        assert_eq!(MinifyFilter::from(MagnifyFilter::Nearest), MinifyFilter::Nearest);
    }
}
