// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! A rendering context that lives entirely in CPU memory.

[SoftwareContext] keeps every mip level of every texture it creates in ordinary vectors and
records each call made against it.  It is useful for headless hosts and for checking exactly
what a binder did.

Tasks spawned on the context (refresh loops) are queued on a local pool and only make progress
when the owner calls [SoftwareContext::run_until_stalled], which mirrors a real render loop
servicing its own thread between frames.

```
use texture_acquire::context::{RenderingContext, TextureDescriptor};
use texture_acquire::context::software::SoftwareContext;
use texture_acquire::images::source::Frame;

let context = SoftwareContext::new();
let texture = context.create_texture(&TextureDescriptor {
    label: "example".to_string(),
    width: 2,
    height: 2,
    mip_level_count: 1,
});
context.bind_texture(Some(&texture));
context.upload(&Frame::filled(2, 2, [255, 0, 0, 255])).unwrap();
context.bind_texture(None);
assert_eq!(texture.level(0).unwrap()[0..4], [255, 0, 0, 255]);
```
*/

use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

use crate::bindings::sampler::SamplingOptions;
use crate::context::mipmap;
use crate::context::{FrameClock, GpuError, RenderingContext, TextureDescriptor};
use crate::images::source::Frame;

/// One call made against a [SoftwareContext].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateTexture {
        handle: u32,
        width: u32,
        height: u32,
        mip_level_count: u32,
    },
    BindTexture(Option<u32>),
    SetFlipY(bool),
    Upload {
        handle: u32,
        width: u32,
        height: u32,
    },
    SetSampling {
        handle: u32,
        options: SamplingOptions,
    },
    GenerateMipmaps {
        handle: u32,
    },
}

#[derive(Clone)]
pub struct SoftwareContext {
    inner: Rc<Inner>,
}

struct Inner {
    next_handle: Cell<u32>,
    bound: RefCell<Option<SoftwareTexture>>,
    flip_y: Cell<bool>,
    calls: RefCell<Vec<Call>>,
    clock: FrameClock,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl SoftwareContext {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        SoftwareContext {
            inner: Rc::new(Inner {
                next_handle: Cell::new(1),
                bound: RefCell::new(None),
                flip_y: Cell::new(false),
                calls: RefCell::new(Vec::new()),
                clock: FrameClock::new(),
                pool: RefCell::new(pool),
                spawner,
            }),
        }
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.borrow_mut().clear();
    }

    /// Runs spawned tasks until none of them can make progress.
    pub fn run_until_stalled(&self) {
        self.inner.pool.borrow_mut().run_until_stalled();
    }

    /// Presents a frame: ticks the clock, then services spawned tasks.
    pub fn present_frame(&self) -> u64 {
        let frame = self.inner.clock.tick();
        self.run_until_stalled();
        frame
    }

    /// Closes the frame clock and lets spawned tasks observe it.
    pub fn teardown(&self) {
        self.inner.clock.close();
        self.run_until_stalled();
    }

    pub fn bound(&self) -> Option<SoftwareTexture> {
        self.inner.bound.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.inner.calls.borrow_mut().push(call);
    }

    fn with_bound<R>(&self, f: impl FnOnce(&SoftwareTexture) -> R) -> Result<R, GpuError> {
        let bound = self.inner.bound.borrow();
        let texture = bound.as_ref().ok_or(GpuError::NothingBound)?;
        Ok(f(texture))
    }
}

impl Default for SoftwareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SoftwareContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareContext")
            .field("bound", &self.inner.bound.borrow().as_ref().map(SoftwareTexture::handle))
            .field("flip_y", &self.inner.flip_y.get())
            .field("calls", &self.inner.calls.borrow().len())
            .field("clock", &self.inner.clock)
            .finish()
    }
}

/// A texture held by a [SoftwareContext].
#[derive(Clone)]
pub struct SoftwareTexture {
    inner: Rc<TextureInner>,
}

struct TextureInner {
    handle: u32,
    width: u32,
    height: u32,
    mip_level_count: u32,
    levels: RefCell<Vec<Option<Vec<u8>>>>,
    sampling: Cell<Option<SamplingOptions>>,
    uploads: Cell<usize>,
    mipmap_generations: Cell<usize>,
}

impl SoftwareTexture {
    pub fn handle(&self) -> u32 {
        self.inner.handle
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    pub fn mip_level_count(&self) -> u32 {
        self.inner.mip_level_count
    }

    /// Pixels of `level` as stored, bottom row first when uploaded flipped.
    pub fn level(&self, level: u32) -> Option<Vec<u8>> {
        self.inner.levels.borrow().get(level as usize)?.clone()
    }

    pub fn sampling(&self) -> Option<SamplingOptions> {
        self.inner.sampling.get()
    }

    /// Number of level-0 uploads so far.
    pub fn upload_count(&self) -> usize {
        self.inner.uploads.get()
    }

    pub fn mipmap_generations(&self) -> usize {
        self.inner.mipmap_generations.get()
    }
}

impl PartialEq for SoftwareTexture {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for SoftwareTexture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareTexture")
            .field("handle", &self.inner.handle)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("mip_level_count", &self.inner.mip_level_count)
            .field("uploads", &self.inner.uploads.get())
            .finish()
    }
}

impl RenderingContext for SoftwareContext {
    type Texture = SoftwareTexture;

    fn create_texture(&self, descriptor: &TextureDescriptor) -> SoftwareTexture {
        let handle = self.inner.next_handle.get();
        self.inner.next_handle.set(handle + 1);
        self.record(Call::CreateTexture {
            handle,
            width: descriptor.width,
            height: descriptor.height,
            mip_level_count: descriptor.mip_level_count,
        });
        logwise::trace_sync!(
            "software texture {handle} created for {label}",
            handle = handle,
            label = logwise::privacy::LogIt(&descriptor.label)
        );
        SoftwareTexture {
            inner: Rc::new(TextureInner {
                handle,
                width: descriptor.width,
                height: descriptor.height,
                mip_level_count: descriptor.mip_level_count,
                levels: RefCell::new(vec![None; descriptor.mip_level_count.max(1) as usize]),
                sampling: Cell::new(None),
                uploads: Cell::new(0),
                mipmap_generations: Cell::new(0),
            }),
        }
    }

    fn bind_texture(&self, texture: Option<&SoftwareTexture>) {
        self.record(Call::BindTexture(texture.map(SoftwareTexture::handle)));
        *self.inner.bound.borrow_mut() = texture.cloned();
    }

    fn set_flip_y(&self, flip: bool) {
        self.record(Call::SetFlipY(flip));
        self.inner.flip_y.set(flip);
    }

    fn upload(&self, frame: &Frame) -> Result<(), GpuError> {
        let flip = self.inner.flip_y.get();
        self.with_bound(|texture| {
            if frame.dimensions() != texture.dimensions() {
                return Err(GpuError::SizeMismatch {
                    frame_width: frame.width(),
                    frame_height: frame.height(),
                    texture_width: texture.inner.width,
                    texture_height: texture.inner.height,
                });
            }
            texture.inner.levels.borrow_mut()[0] = Some(frame.rows_for_upload(flip));
            texture.inner.uploads.set(texture.inner.uploads.get() + 1);
            self.record(Call::Upload {
                handle: texture.handle(),
                width: frame.width(),
                height: frame.height(),
            });
            Ok(())
        })?
    }

    fn set_sampling(&self, options: &SamplingOptions) -> Result<(), GpuError> {
        self.with_bound(|texture| {
            texture.inner.sampling.set(Some(*options));
            self.record(Call::SetSampling {
                handle: texture.handle(),
                options: *options,
            });
        })
    }

    fn generate_mipmaps(&self) -> Result<(), GpuError> {
        self.with_bound(|texture| -> Result<(), GpuError> {
            let mut levels = texture.inner.levels.borrow_mut();
            let base = levels[0].clone().ok_or(GpuError::NothingUploaded)?;
            let chain = mipmap::chain(
                &base,
                texture.inner.width,
                texture.inner.height,
                texture.inner.mip_level_count,
            );
            for (slot, level) in levels.iter_mut().skip(1).zip(chain) {
                *slot = Some(level);
            }
            texture
                .inner
                .mipmap_generations
                .set(texture.inner.mipmap_generations.get() + 1);
            self.record(Call::GenerateMipmaps {
                handle: texture.handle(),
            });
            Ok(())
        })?
    }

    fn frame_clock(&self) -> &FrameClock {
        &self.inner.clock
    }

    fn spawn_local(&self, label: &str, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.inner.spawner.spawn_local(task) {
            logwise::error_sync!(
                "could not spawn {label}: {err}",
                label = logwise::privacy::LogIt(&label),
                err = logwise::privacy::LogIt(&e)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(width: u32, height: u32, mip_level_count: u32) -> TextureDescriptor {
        TextureDescriptor {
            label: "test".to_string(),
            width,
            height,
            mip_level_count,
        }
    }

    #[test]
    fn upload_requires_a_bound_texture() {
        let context = SoftwareContext::new();
        assert_eq!(
            context.upload(&Frame::filled(1, 1, [0; 4])),
            Err(GpuError::NothingBound)
        );
    }

    #[test]
    fn upload_checks_dimensions() {
        let context = SoftwareContext::new();
        let texture = context.create_texture(&descriptor(4, 4, 1));
        context.bind_texture(Some(&texture));
        assert_eq!(
            context.upload(&Frame::filled(2, 2, [0; 4])),
            Err(GpuError::SizeMismatch {
                frame_width: 2,
                frame_height: 2,
                texture_width: 4,
                texture_height: 4
            })
        );
        assert_eq!(texture.upload_count(), 0);
    }

    #[test]
    fn flipped_upload() {
        let context = SoftwareContext::new();
        let texture = context.create_texture(&descriptor(1, 2, 1));
        context.bind_texture(Some(&texture));
        context.set_flip_y(true);
        let frame = Frame::new(1, 2, vec![1, 1, 1, 1, 2, 2, 2, 2]).unwrap();
        context.upload(&frame).unwrap();
        assert_eq!(texture.level(0).unwrap(), vec![2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn mipmaps_fill_every_level() {
        let context = SoftwareContext::new();
        let texture = context.create_texture(&descriptor(4, 4, 3));
        context.bind_texture(Some(&texture));
        assert_eq!(context.generate_mipmaps(), Err(GpuError::NothingUploaded));
        context.upload(&Frame::filled(4, 4, [8, 16, 32, 255])).unwrap();
        context.generate_mipmaps().unwrap();
        assert_eq!(texture.level(1).unwrap().len(), 2 * 2 * 4);
        assert_eq!(texture.level(2).unwrap(), vec![8, 16, 32, 255]);
        assert_eq!(texture.mipmap_generations(), 1);
    }

    #[test]
    fn handles_are_distinct() {
        let context = SoftwareContext::new();
        let a = context.create_texture(&descriptor(1, 1, 1));
        let b = context.create_texture(&descriptor(1, 1, 1));
        assert_ne!(a.handle(), b.handle());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
