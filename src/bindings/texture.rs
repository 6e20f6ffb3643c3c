// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! The acquired texture handle.

A [Texture] is what a successful load resolves to.  It knows its identity and size, and carries
(but has not run) the work needed to put its pixels on a GPU.  That work runs when the owner of a
rendering context calls [Texture::bind].

Binding is not memoized.  Each call allocates a fresh native texture, so the renderer that owns
the texture is expected to bind it once and keep the native handle.
*/

use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::RenderingContext;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique texture identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        TextureId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for TextureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

/// Deferred GPU creation for a texture.
///
/// Implementations close over validated pixel content and sampling options.  `bind` performs the
/// whole upload against `context` and returns the native handle it allocated, even if some later
/// step of the upload failed.
pub trait GpuBindable<C: RenderingContext>: Send + Sync {
    fn bind(&self, context: &C) -> C::Texture;
}

/// A validated texture, ready to be bound into a rendering context of type `C`.
pub struct Texture<C: RenderingContext> {
    id: TextureId,
    width: u32,
    height: u32,
    binder: Box<dyn GpuBindable<C>>,
}

impl<C: RenderingContext> Texture<C> {
    pub fn new(width: u32, height: u32, binder: impl GpuBindable<C> + 'static) -> Self {
        Self::from_bindable(width, height, Box::new(binder))
    }

    pub fn from_bindable(width: u32, height: u32, binder: Box<dyn GpuBindable<C>>) -> Self {
        Texture {
            id: TextureId::next(),
            width,
            height,
            binder,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions observed when the texture was acquired.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Creates and uploads a native texture.
    pub fn bind(&self, context: &C) -> C::Texture {
        self.binder.bind(context)
    }
}

/// Same as [Texture::size].
pub fn size<C: RenderingContext>(texture: &Texture<C>) -> (u32, u32) {
    texture.size()
}

impl<C: RenderingContext> Debug for Texture<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::software::{SoftwareContext, SoftwareTexture};
    use crate::context::{RenderingContext, TextureDescriptor};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting(Arc<AtomicUsize>);

    impl GpuBindable<SoftwareContext> for Counting {
        fn bind(&self, context: &SoftwareContext) -> SoftwareTexture {
            self.0.fetch_add(1, Ordering::Relaxed);
            context.create_texture(&TextureDescriptor {
                label: "counting".to_string(),
                width: 1,
                height: 1,
                mip_level_count: 1,
            })
        }
    }

    #[test]
    fn ids_are_unique() {
        let a = Texture::<SoftwareContext>::new(1, 1, Counting::default());
        let b = Texture::<SoftwareContext>::new(1, 1, Counting::default());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn bind_is_not_memoized() {
        let binder = Counting::default();
        let count = binder.0.clone();
        let texture = Texture::new(1, 1, binder);
        let context = SoftwareContext::new();
        let first = texture.bind(&context);
        let second = texture.bind(&context);
        assert_ne!(first.handle(), second.handle());
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn size_is_fixed() {
        let texture = Texture::<SoftwareContext>::new(300, 200, Counting::default());
        assert_eq!(size(&texture), (300, 200));
        assert_eq!((texture.width(), texture.height()), texture.size());
    }
}
