// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use wgpu::{AddressMode, FilterMode, SamplerDescriptor};

use crate::bindings::sampler::{MagnifyFilter, MinifyFilter, SamplingOptions, Wrap};

const fn address_mode(wrap: Wrap) -> AddressMode {
    match wrap {
        Wrap::Repeat => AddressMode::Repeat,
        Wrap::ClampToEdge => AddressMode::ClampToEdge,
        Wrap::MirroredRepeat => AddressMode::MirrorRepeat,
    }
}

const fn mag_filter(filter: MagnifyFilter) -> FilterMode {
    match filter {
        MagnifyFilter::Nearest => FilterMode::Nearest,
        MagnifyFilter::Linear => FilterMode::Linear,
    }
}

/// `(min_filter, mipmap_filter)` for a minify filter.
const fn min_filters(filter: MinifyFilter) -> (FilterMode, FilterMode) {
    match filter {
        MinifyFilter::Nearest => (FilterMode::Nearest, FilterMode::Nearest),
        MinifyFilter::Linear => (FilterMode::Linear, FilterMode::Nearest),
        MinifyFilter::NearestMipmapNearest => (FilterMode::Nearest, FilterMode::Nearest),
        MinifyFilter::LinearMipmapNearest => (FilterMode::Linear, FilterMode::Nearest),
        MinifyFilter::NearestMipmapLinear => (FilterMode::Nearest, FilterMode::Linear),
        MinifyFilter::LinearMipmapLinear => (FilterMode::Linear, FilterMode::Linear),
    }
}

pub(super) fn descriptor<'a>(label: &'a str, options: &SamplingOptions) -> SamplerDescriptor<'a> {
    let (min_filter, mipmap_filter) = min_filters(options.minify);
    SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode(options.wrap_horizontal),
        address_mode_v: address_mode(options.wrap_vertical),
        address_mode_w: AddressMode::ClampToEdge,
        mag_filter: mag_filter(options.magnify),
        min_filter,
        mipmap_filter,
        lod_min_clamp: 0.0,
        //non-mipmapped filters only ever read level 0
        lod_max_clamp: if options.is_mipmapped() { 32.0 } else { 0.0 },
        compare: None,
        anisotropy_clamp: 1,
        border_color: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let d = descriptor("t", &SamplingOptions::DEFAULT);
        assert_eq!(d.address_mode_u, AddressMode::Repeat);
        assert_eq!(d.mag_filter, FilterMode::Linear);
        assert_eq!(d.min_filter, FilterMode::Nearest);
        assert_eq!(d.mipmap_filter, FilterMode::Linear);
    }

    #[test]
    fn non_power_of_two_never_leaves_level_zero() {
        let d = descriptor("t", &SamplingOptions::NON_POWER_OF_TWO);
        assert_eq!(d.address_mode_v, AddressMode::ClampToEdge);
        assert_eq!(d.lod_max_clamp, 0.0);
    }
}
