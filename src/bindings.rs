// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Texture handles and what happens when they meet a rendering context. */

pub mod sampler;
pub mod validate;
pub mod texture;
pub mod binder;
pub mod refresh;

pub use sampler::SamplingOptions;
pub use texture::{GpuBindable, Texture, TextureId};
