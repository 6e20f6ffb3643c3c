// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! The rendering context contract.

A [RenderingContext] is whatever owns the GPU: it creates texture objects, keeps a single "bound"
2D target, and accepts uploads and parameter changes for that target.  The shape follows the
classic bind-then-mutate model, so a GL-style backend maps onto it directly; backends without
bind points (wgpu) track the bound texture themselves.

Contexts are single-owner.  Every GPU-touching call in this crate takes the context explicitly;
nothing stores one as ambient state except a refresh loop, which keeps a clone of the context it
was installed on and runs on that context's own task spawner.

Two contexts ship with the crate:

* [software::SoftwareContext], which keeps textures in CPU memory and records every call.
* `WgpuContext` (feature `backend_wgpu`), over a `wgpu::Device` and `wgpu::Queue`.
*/

pub mod frame_clock;
pub mod mipmap;
pub mod software;

use std::fmt::Debug;

use futures::future::LocalBoxFuture;

pub use frame_clock::FrameClock;

use crate::bindings::sampler::SamplingOptions;
use crate::images::source::{Frame, SourceError};

/// Errors raised by a context while a texture is being uploaded or configured.
///
/// These never reach the caller that acquired the texture; by the time they can happen the
/// acquisition has already completed, so they are logged instead.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("no texture is bound")]
    NothingBound,
    #[error("frame is {frame_width}x{frame_height} but the texture is {texture_width}x{texture_height}")]
    SizeMismatch {
        frame_width: u32,
        frame_height: u32,
        texture_width: u32,
        texture_height: u32,
    },
    #[error("a {width}x{height} texture cannot be allocated; each side must be between 1 and {max}")]
    UnsupportedExtent { width: u32, height: u32, max: u32 },
    #[error("nothing has been uploaded to build mipmaps from")]
    NothingUploaded,
    #[error("live source: {0}")]
    Source(#[from] SourceError),
}

/// Parameters for allocating a native texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
}

impl TextureDescriptor {
    pub fn new(label: impl Into<String>, width: u32, height: u32, options: &SamplingOptions) -> Self {
        TextureDescriptor {
            label: label.into(),
            width,
            height,
            mip_level_count: options.mip_level_count(width, height),
        }
    }
}

/// A GPU owner that textures can be bound into.
pub trait RenderingContext: Clone + 'static {
    /// The backend's native texture object.  Cloning yields another reference to the same
    /// object, never a copy of it.
    type Texture: Clone + Debug + 'static;

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Self::Texture;

    /// Makes `texture` the active 2D target, or clears the target with `None`.
    fn bind_texture(&self, texture: Option<&Self::Texture>);

    /// Whether subsequent uploads are flipped vertically.
    fn set_flip_y(&self, flip: bool);

    /// Uploads `frame` into mip level 0 of the bound texture.
    fn upload(&self, frame: &Frame) -> Result<(), GpuError>;

    /// Applies filters and wrap modes to the bound texture.
    fn set_sampling(&self, options: &SamplingOptions) -> Result<(), GpuError>;

    /// Rebuilds every mip level of the bound texture from level 0.
    fn generate_mipmaps(&self) -> Result<(), GpuError>;

    /// The per-frame signal of the display this context renders to.
    fn frame_clock(&self) -> &FrameClock;

    /// Runs `task` on the thread that owns this context.
    fn spawn_local(&self, label: &str, task: LocalBoxFuture<'static, ()>);
}
