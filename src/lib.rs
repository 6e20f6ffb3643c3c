// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! texture_acquire turns pixel sources into GPU textures.

A pixel source is either an image behind a URL, or a live element in a host document: a canvas,
a video, an image or an SVG.  Acquiring a texture is asynchronous and can fail; binding it to a
GPU is deferred until whoever owns the rendering context asks for it.

| Stage       | Where                              | Runs on                      | Fails with            |
|-------------|------------------------------------|------------------------------|-----------------------|
| Acquire     | [images::Loader]                   | any executor                 | [images::LoadError]   |
| Validate    | [bindings::validate]               | as part of acquire           | `SizeInvalid`         |
| Bind        | [bindings::Texture::bind]          | the context's owning thread  | logged, never surfaced |
| Refresh     | [bindings::refresh]                | the context's owning thread  | logged, tick skipped  |

# Acquiring

```
use texture_acquire::context::software::SoftwareContext;
use texture_acquire::images::{LoadError, Loader, LoaderConfig};

let loader = Loader::new(LoaderConfig::default().with_asset_root("assets"));
//a missing file is a load failure, not a panic
let result = test_executors::spin_on(loader.load::<SoftwareContext>("no_such_texture.png"));
assert_eq!(result.unwrap_err(), LoadError::LoadFailed);
```

# Sizes

Textures sampled with [bindings::SamplingOptions::DEFAULT] must have power-of-two
dimensions, because the default minify filter reads from mipmaps and the default wrap mode
repeats.  Anything else needs edge clamping and a non-mipmapped filter, which is what
[bindings::SamplingOptions::NON_POWER_OF_TWO] is.

A texture's size is fixed when it is acquired.  Live textures keep that size even if their
element later shows something of a different size; such frames are skipped.

# Live textures

[images::Loader::from_element_with_options] takes a signed cadence.  Positive values refresh on a
timer with that period in milliseconds, negative values refresh once per frame, and zero never
refreshes.  A refresh loop belongs to the context it was bound on and stops when that context is
torn down.  There is no way to stop one sooner.

# Backends

The [context::RenderingContext] trait is the GPU seam.  [context::software::SoftwareContext]
keeps textures in memory and is always available; `WgpuContext` is available with the
`backend_wgpu` feature (on by default).
*/

pub mod bindings;
pub mod context;
pub mod images;
mod imp;
mod sys;

#[cfg(feature = "backend_wgpu")]
pub use imp::{WgpuContext, WgpuTexture};

pub use bindings::texture::size;
pub use bindings::{SamplingOptions, Texture};
pub use images::{Acquire, LoadError, Loader, LoaderConfig};
