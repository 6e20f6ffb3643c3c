// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
mod context;
mod sampler;

pub use context::{WgpuContext, WgpuTexture};
