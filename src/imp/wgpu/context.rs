// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! A rendering context over a wgpu device.

wgpu has no bind points, so the context tracks the "bound" texture and the flip flag itself.
Uploads go through `Queue::write_texture`; flipping and mipmap generation happen on the CPU
before the data is written.

Every device and queue call runs inside a validation error scope.  Errors caught there are
logged once the scope resolves, instead of reaching wgpu's uncaptured error handler.  Extents the
device cannot allocate are caught up front; those textures get a 1×1 placeholder so the bind still
returns a handle, and every upload into it fails with [GpuError::SizeMismatch].

Refresh loops are spawned with `some_executor` onto the current thread's executor, which must be
the thread that owns the device and queue.
*/

use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use some_executor::task::{Configuration, Task};
use wgpu::{Extent3d, TexelCopyBufferLayout, TexelCopyTextureInfo};

use crate::bindings::sampler::SamplingOptions;
use crate::context::mipmap;
use crate::context::{FrameClock, GpuError, RenderingContext, TextureDescriptor};
use crate::images::source::{BYTES_PER_PIXEL, Frame};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Clone)]
pub struct WgpuContext {
    inner: Rc<Inner>,
}

struct Inner {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bound: RefCell<Option<WgpuTexture>>,
    flip_y: Cell<bool>,
    clock: FrameClock,
}

impl WgpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        WgpuContext {
            inner: Rc::new(Inner {
                device,
                queue,
                bound: RefCell::new(None),
                flip_y: Cell::new(false),
                clock: FrameClock::new(),
            }),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.inner.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.inner.queue
    }

    /// Call once per presented frame.  Not needed on wasm32 after
    /// [FrameClock::drive_from_display].
    pub fn present_frame(&self) -> u64 {
        self.inner.clock.tick()
    }

    /// Stops every refresh loop installed on this context.
    pub fn teardown(&self) {
        logwise::info_sync!("tearing down wgpu context");
        self.inner.clock.close();
    }

    fn bound(&self) -> Result<WgpuTexture, GpuError> {
        self.inner
            .bound
            .borrow()
            .clone()
            .ok_or(GpuError::NothingBound)
    }

    /// Runs `f` inside a validation error scope and logs whatever it raised.
    fn scoped<R>(&self, what: &'static str, f: impl FnOnce() -> R) -> R {
        self.inner.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let r = f();
        let popped = self.inner.device.pop_error_scope();
        Task::without_notifications(
            format!("texture_acquire {what} error scope"),
            Configuration::default(),
            async move {
                if let Some(e) = popped.await {
                    logwise::error_sync!(
                        "wgpu rejected {what}: {err}",
                        what = logwise::privacy::LogIt(&what),
                        err = logwise::privacy::LogIt(&e)
                    );
                }
            },
        )
        .spawn_thread_local();
        r
    }

    fn write_level(&self, texture: &WgpuTexture, level: u32, data: &[u8]) {
        let (width, height) = mipmap::level_size(texture.inner.width, texture.inner.height, level);
        self.scoped("texture write", || {
            self.inner.queue.write_texture(
                TexelCopyTextureInfo {
                    texture: &texture.inner.texture,
                    mip_level: level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * BYTES_PER_PIXEL as u32),
                    rows_per_image: Some(height),
                },
                Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        });
    }
}

/// The extent to allocate for `descriptor`, if the device can hold it.
fn allocation_extent(
    descriptor: &TextureDescriptor,
    limits: &wgpu::Limits,
) -> Result<Extent3d, GpuError> {
    let max = limits.max_texture_dimension_2d;
    let fits = |side: u32| (1..=max).contains(&side);
    if fits(descriptor.width) && fits(descriptor.height) {
        Ok(Extent3d {
            width: descriptor.width,
            height: descriptor.height,
            depth_or_array_layers: 1,
        })
    } else {
        Err(GpuError::UnsupportedExtent {
            width: descriptor.width,
            height: descriptor.height,
            max,
        })
    }
}

impl Debug for WgpuContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuContext")
            .field("bound", &self.inner.bound.borrow())
            .field("flip_y", &self.inner.flip_y.get())
            .field("clock", &self.inner.clock)
            .finish_non_exhaustive()
    }
}

/// A texture owned by a [WgpuContext].
#[derive(Clone)]
pub struct WgpuTexture {
    inner: Rc<TextureInner>,
}

struct TextureInner {
    label: String,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: RefCell<Option<Rc<wgpu::Sampler>>>,
    width: u32,
    height: u32,
    mip_level_count: u32,
    //level 0 as last written, for building mipmaps
    base: RefCell<Option<Vec<u8>>>,
}

impl WgpuTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.inner.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.inner.view
    }

    /// The sampler built from the texture's sampling options, once they have been applied.
    pub fn sampler(&self) -> Option<Rc<wgpu::Sampler>> {
        self.inner.sampler.borrow().clone()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }
}

impl Debug for WgpuTexture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuTexture")
            .field("label", &self.inner.label)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("mip_level_count", &self.inner.mip_level_count)
            .finish_non_exhaustive()
    }
}

impl RenderingContext for WgpuContext {
    type Texture = WgpuTexture;

    fn create_texture(&self, descriptor: &TextureDescriptor) -> WgpuTexture {
        let (size, mip_level_count) =
            match allocation_extent(descriptor, &self.inner.device.limits()) {
                Ok(size) => (size, descriptor.mip_level_count),
                Err(e) => {
                    logwise::warn_sync!(
                        "{label}: {err}; allocating a placeholder",
                        label = logwise::privacy::LogIt(&descriptor.label),
                        err = logwise::privacy::LogIt(&e)
                    );
                    let placeholder = Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    };
                    (placeholder, 1)
                }
            };
        let texture = self.scoped("texture allocation", || {
            self.inner.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(descriptor.label.as_str()),
                size,
                mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        WgpuTexture {
            inner: Rc::new(TextureInner {
                label: descriptor.label.clone(),
                texture,
                view,
                sampler: RefCell::new(None),
                width: size.width,
                height: size.height,
                mip_level_count,
                base: RefCell::new(None),
            }),
        }
    }

    fn bind_texture(&self, texture: Option<&WgpuTexture>) {
        *self.inner.bound.borrow_mut() = texture.cloned();
    }

    fn set_flip_y(&self, flip: bool) {
        self.inner.flip_y.set(flip);
    }

    fn upload(&self, frame: &Frame) -> Result<(), GpuError> {
        let texture = self.bound()?;
        if frame.dimensions() != texture.dimensions() {
            return Err(GpuError::SizeMismatch {
                frame_width: frame.width(),
                frame_height: frame.height(),
                texture_width: texture.inner.width,
                texture_height: texture.inner.height,
            });
        }
        let data = frame.rows_for_upload(self.inner.flip_y.get());
        self.write_level(&texture, 0, &data);
        texture.inner.base.replace(Some(data));
        Ok(())
    }

    fn set_sampling(&self, options: &SamplingOptions) -> Result<(), GpuError> {
        let texture = self.bound()?;
        let sampler = self.scoped("sampler", || {
            self.inner
                .device
                .create_sampler(&super::sampler::descriptor(&texture.inner.label, options))
        });
        texture.inner.sampler.replace(Some(Rc::new(sampler)));
        Ok(())
    }

    fn generate_mipmaps(&self) -> Result<(), GpuError> {
        let texture = self.bound()?;
        let base = texture.inner.base.borrow();
        let base = base.as_ref().ok_or(GpuError::NothingUploaded)?;
        let levels = mipmap::chain(
            base,
            texture.inner.width,
            texture.inner.height,
            texture.inner.mip_level_count,
        );
        for (level, data) in (1..).zip(levels.iter()) {
            self.write_level(&texture, level, data);
        }
        Ok(())
    }

    fn frame_clock(&self) -> &FrameClock {
        &self.inner.clock
    }

    fn spawn_local(&self, label: &str, task: LocalBoxFuture<'static, ()>) {
        Task::without_notifications(label.to_string(), Configuration::default(), task)
            .spawn_thread_local();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor::new("t", width, height, &SamplingOptions::NON_POWER_OF_TWO)
    }

    #[test]
    fn extents_within_limits_are_allocated() {
        let limits = wgpu::Limits::default();
        let extent = allocation_extent(&descriptor(300, 200), &limits).unwrap();
        assert_eq!((extent.width, extent.height), (300, 200));
        let max = limits.max_texture_dimension_2d;
        assert!(allocation_extent(&descriptor(max, 1), &limits).is_ok());
    }

    #[test]
    fn empty_extents_are_refused() {
        let limits = wgpu::Limits::default();
        assert_eq!(
            allocation_extent(&descriptor(0, 0), &limits),
            Err(GpuError::UnsupportedExtent {
                width: 0,
                height: 0,
                max: limits.max_texture_dimension_2d
            })
        );
        assert!(allocation_extent(&descriptor(16, 0), &limits).is_err());
    }

    #[test]
    fn oversized_extents_are_refused() {
        let limits = wgpu::Limits::default();
        let too_big = limits.max_texture_dimension_2d * 2;
        assert!(matches!(
            allocation_extent(&descriptor(too_big, too_big), &limits),
            Err(GpuError::UnsupportedExtent { .. })
        ));
    }
}
