// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Deferred GPU creation for acquired textures.

Both binders follow the same sequence against a rendering context:

1. allocate a native texture sized for the acquired dimensions
2. bind it
3. set the vertical flip for uploads
4. upload the pixel content
5. apply the sampler parameters
6. build mipmaps, when the minify filter needs them
7. unbind

A failed upload skips step 6 but not step 5, since sampler parameters don't depend on pixels.
Any failure is logged; the texture is still unbound and the allocated handle is still returned.
Nothing upstream can recover from a failed upload in the middle of a frame.

[ElementBinder] additionally installs a [RefreshScheduler] after step 7 when its cadence asks
for one, whether or not the first upload worked.  A video that has not decoded its first frame
yet will simply fill in on a later tick, which also builds the mipmaps step 6 skipped.
*/

use std::sync::Arc;

use crate::bindings::refresh::{Cadence, RefreshScheduler};
use crate::bindings::sampler::SamplingOptions;
use crate::bindings::texture::GpuBindable;
use crate::context::{GpuError, RenderingContext, TextureDescriptor};
use crate::images::source::{Frame, LiveSource};

/// Steps 1 to 7.  Returns the handle and the outcome of steps 3 to 6.
fn upload_once<C: RenderingContext>(
    context: &C,
    descriptor: &TextureDescriptor,
    options: &SamplingOptions,
    frame: impl FnOnce() -> Result<Frame, GpuError>,
) -> (C::Texture, Result<(), GpuError>) {
    let texture = context.create_texture(descriptor);
    context.bind_texture(Some(&texture));
    let result = (|| -> Result<(), GpuError> {
        context.set_flip_y(options.flip_vertical);
        let uploaded = frame().and_then(|frame| context.upload(&frame));
        let sampled = context.set_sampling(options);
        uploaded?;
        sampled?;
        if options.is_mipmapped() {
            context.generate_mipmaps()?;
        }
        Ok(())
    })();
    context.bind_texture(None);
    (texture, result)
}

/// Binds a decoded image.
#[derive(Debug, Clone)]
pub struct ImageBinder {
    frame: Frame,
    options: SamplingOptions,
    label: String,
}

impl ImageBinder {
    pub fn new(frame: Frame, options: SamplingOptions, label: impl Into<String>) -> Self {
        ImageBinder {
            frame,
            options,
            label: label.into(),
        }
    }
}

impl<C: RenderingContext> GpuBindable<C> for ImageBinder {
    fn bind(&self, context: &C) -> C::Texture {
        let descriptor = TextureDescriptor::new(
            self.label.clone(),
            self.frame.width(),
            self.frame.height(),
            &self.options,
        );
        let (texture, result) =
            upload_once(context, &descriptor, &self.options, || Ok(self.frame.clone()));
        if let Err(e) = result {
            logwise::error_sync!(
                "GPU upload of {label} failed: {err}",
                label = logwise::privacy::LogIt(&self.label),
                err = logwise::privacy::LogIt(&e)
            );
        }
        texture
    }
}

/// Binds a live element, and keeps it fresh if asked to.
#[derive(Debug, Clone)]
pub struct ElementBinder {
    source: Arc<dyn LiveSource>,
    options: SamplingOptions,
    cadence: Cadence,
    label: String,
    width: u32,
    height: u32,
}

impl ElementBinder {
    /// `width` and `height` are the dimensions observed (and validated) at acquisition.  The
    /// native texture is allocated at that size regardless of what the source shows later.
    pub fn new(
        source: Arc<dyn LiveSource>,
        options: SamplingOptions,
        cadence: Cadence,
        label: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        ElementBinder {
            source,
            options,
            cadence,
            label: label.into(),
            width,
            height,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }
}

impl<C: RenderingContext> GpuBindable<C> for ElementBinder {
    fn bind(&self, context: &C) -> C::Texture {
        let descriptor =
            TextureDescriptor::new(self.label.clone(), self.width, self.height, &self.options);
        let (texture, result) = upload_once(context, &descriptor, &self.options, || {
            Ok(self.source.current_frame()?)
        });
        if let Err(e) = &result {
            logwise::warn_sync!(
                "initial upload of {label} failed: {err}",
                label = logwise::privacy::LogIt(&self.label),
                err = logwise::privacy::LogIt(e)
            );
        }
        if self.cadence.is_dynamic() {
            let mipmaps_pending = result.is_err() && self.options.is_mipmapped();
            RefreshScheduler::new(
                self.source.clone(),
                self.options.flip_vertical,
                self.cadence,
                self.label.clone(),
            )
            .with_mipmaps_pending(mipmaps_pending)
            .install(context, texture.clone());
        }
        texture
    }
}
