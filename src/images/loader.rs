// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Acquiring textures.

A [Loader] turns a URL or an element identifier into a [Texture].  Every operation returns an
[Acquire], a future that resolves exactly once: either a validated texture ready to be bound, or
a [LoadError].  No GPU work happens here; the texture is bound later by whoever owns the
rendering context.

```
use std::sync::Arc;
use texture_acquire::context::software::SoftwareContext;
use texture_acquire::images::document::{MemoryDocument, MemoryElement};
use texture_acquire::images::loader::{LoadError, Loader, LoaderConfig};

let document = Arc::new(MemoryDocument::new());
document.insert("empty", Arc::new(MemoryElement::empty()));
let loader = Loader::new(LoaderConfig::default()).with_document(document);

let result = test_executors::spin_on(loader.from_element::<SoftwareContext>("empty"));
assert_eq!(result.unwrap_err(), LoadError::SourceNotFound("empty".to_string()));
```
*/

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;

use crate::bindings::binder::{ElementBinder, ImageBinder};
use crate::bindings::refresh::Cadence;
use crate::bindings::sampler::SamplingOptions;
use crate::bindings::texture::Texture;
use crate::bindings::validate;
use crate::context::RenderingContext;
use crate::images::decode::decode_png;
use crate::images::document::Document;
use crate::images::fetch::fetch;

/// Why a texture could not be acquired.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The URL could not be fetched or its content could not be decoded.  The cause is logged.
    #[error("texture could not be loaded")]
    LoadFailed,
    /// The dimensions are incompatible with the requested sampling options.
    #[error("{width}x{height} is not a valid size for the requested sampling options")]
    SizeInvalid { width: u32, height: u32 },
    /// No element with this identifier, or the element has nothing to render.
    #[error("no renderable element {0:?}")]
    SourceNotFound(String),
}

/// Settings shared by every load made through a [Loader].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /**
    Sent as the `Origin` header on remote fetches.

    Every remote fetch is an anonymous cross-origin request: no cookies or credentials are ever
    sent.  A native host has no origin of its own, so the default `None` sends no `Origin`
    header at all, which servers treat the same as an anonymous request.  Hosts that serve
    assets behind CORS checks set this to the origin those servers expect.
    */
    pub origin: Option<String>,
    /// Base directory for relative URLs.
    pub asset_root: PathBuf,
    pub priority: async_file::Priority,
    /// Prefix for native texture labels.
    pub debug_name: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            origin: None,
            asset_root: PathBuf::from("."),
            priority: async_file::Priority::UserInitiated,
            debug_name: "texture_acquire".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_asset_root(mut self, asset_root: impl Into<PathBuf>) -> Self {
        self.asset_root = asset_root.into();
        self
    }

    pub fn with_priority(mut self, priority: async_file::Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_debug_name(mut self, debug_name: impl Into<String>) -> Self {
        self.debug_name = debug_name.into();
        self
    }

    fn label(&self, what: &str) -> String {
        format!("{} {}", self.debug_name, what)
    }
}

/// A pending texture acquisition.
///
/// Resolves exactly once.  Polling again after it has resolved panics.
#[must_use = "futures do nothing unless polled"]
pub struct Acquire<C: RenderingContext> {
    inner: Option<LocalBoxFuture<'static, Result<Texture<C>, LoadError>>>,
}

impl<C: RenderingContext> Acquire<C> {
    fn new(future: impl Future<Output = Result<Texture<C>, LoadError>> + 'static) -> Self {
        Acquire {
            inner: Some(Box::pin(future)),
        }
    }

    /// Whether the acquisition has already resolved.
    pub fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

impl<C: RenderingContext> Future for Acquire<C> {
    type Output = Result<Texture<C>, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(inner) = self.inner.as_mut() else {
            panic!("Acquire polled after it resolved");
        };
        match inner.as_mut().poll(cx) {
            Poll::Ready(result) => {
                self.inner = None;
                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<C: RenderingContext> Debug for Acquire<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquire")
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Shortens `data:` URLs for logs.
fn describe(url: &str) -> &str {
    const MAX: usize = 48;
    if url.len() > MAX && url.get(..5).is_some_and(|s| s.eq_ignore_ascii_case("data:")) {
        let mut end = MAX;
        while !url.is_char_boundary(end) {
            end -= 1;
        }
        &url[..end]
    } else {
        url
    }
}

/// Acquires textures from URLs and from a host document.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: Arc<LoaderConfig>,
    document: Option<Arc<dyn Document>>,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Loader {
            config: Arc::new(config),
            document: None,
        }
    }

    /// The document that element identifiers are looked up in.  Without one, every element
    /// lookup fails with [LoadError::SourceNotFound].
    pub fn with_document(mut self, document: Arc<dyn Document>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads `url` with [SamplingOptions::DEFAULT].
    pub fn load<C: RenderingContext>(&self, url: &str) -> Acquire<C> {
        self.load_with_options(SamplingOptions::DEFAULT, url)
    }

    /**
    Fetches and decodes `url`, then checks its size against `options`.

    # Errors
    * [LoadError::LoadFailed] if the fetch or the decode fails.
    * [LoadError::SizeInvalid] if the image's dimensions can't be sampled with `options`.
    */
    pub fn load_with_options<C: RenderingContext>(
        &self,
        options: SamplingOptions,
        url: &str,
    ) -> Acquire<C> {
        Acquire::new(acquire_url(self.config.clone(), options, url.to_string()))
    }

    /// Wraps element `id` with [SamplingOptions::DEFAULT] and no refresh.
    pub fn from_element<C: RenderingContext>(&self, id: &str) -> Acquire<C> {
        self.from_element_with_options(SamplingOptions::DEFAULT, 0, id)
    }

    /**
    Wraps the renderable child of element `id`.

    `cadence` picks how the texture is refreshed once bound: a positive value is a period in
    milliseconds, a negative value refreshes every frame, and zero never refreshes.  See
    [Cadence::from_millis].

    The texture's size is the child's size when the returned future is first polled.

    # Errors
    * [LoadError::SourceNotFound] if there is no such element, or it has no renderable child.
    * [LoadError::SizeInvalid] if the child's dimensions can't be sampled with `options`.
    */
    pub fn from_element_with_options<C: RenderingContext>(
        &self,
        options: SamplingOptions,
        cadence: i64,
        id: &str,
    ) -> Acquire<C> {
        Acquire::new(acquire_element(
            self.config.clone(),
            self.document.clone(),
            options,
            Cadence::from_millis(cadence),
            id.to_string(),
        ))
    }
}

async fn acquire_url<C: RenderingContext>(
    config: Arc<LoaderConfig>,
    options: SamplingOptions,
    url: String,
) -> Result<Texture<C>, LoadError> {
    logwise::info_sync!("loading {url}", url = logwise::privacy::LogIt(&describe(&url)));
    let bytes = fetch(&url, &config).await.map_err(|e| {
        logwise::error_sync!(
            "fetching {url} failed: {err}",
            url = logwise::privacy::LogIt(&describe(&url)),
            err = logwise::privacy::LogIt(&e)
        );
        LoadError::LoadFailed
    })?;
    let frame = decode_png(&bytes).map_err(|e| {
        logwise::error_sync!(
            "decoding {url} failed: {err}",
            url = logwise::privacy::LogIt(&describe(&url)),
            err = logwise::privacy::LogIt(&e)
        );
        LoadError::LoadFailed
    })?;
    let (width, height) = frame.dimensions();
    validate::check(width, height, &options)?;
    logwise::info_sync!(
        "loaded {url} at {width}x{height}",
        url = logwise::privacy::LogIt(&describe(&url)),
        width = width,
        height = height
    );
    let label = config.label(describe(&url));
    Ok(Texture::new(width, height, ImageBinder::new(frame, options, label)))
}

async fn acquire_element<C: RenderingContext>(
    config: Arc<LoaderConfig>,
    document: Option<Arc<dyn Document>>,
    options: SamplingOptions,
    cadence: Cadence,
    id: String,
) -> Result<Texture<C>, LoadError> {
    let Some(child) = document
        .as_ref()
        .and_then(|d| d.element_by_id(&id))
        .and_then(|element| element.renderable_child())
    else {
        logwise::warn_sync!(
            "no renderable element {id}",
            id = logwise::privacy::LogIt(&id)
        );
        return Err(LoadError::SourceNotFound(id));
    };
    let (width, height) = child.dimensions();
    validate::check(width, height, &options)?;
    logwise::info_sync!(
        "wrapped {kind} {id} at {width}x{height}",
        kind = logwise::privacy::LogIt(&child.kind()),
        id = logwise::privacy::LogIt(&id),
        width = width,
        height = height
    );
    let binder = ElementBinder::new(child, options, cadence, config.label(&id), width, height);
    Ok(Texture::new(width, height, binder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::software::SoftwareContext;
    use futures::FutureExt;

    #[test]
    fn describe_truncates_data_urls() {
        let long = format!("data:image/png;base64,{}", "A".repeat(100));
        assert_eq!(describe(&long).len(), 48);
        assert_eq!(describe("texture.png"), "texture.png");
    }

    #[test]
    fn no_document_means_not_found() {
        let loader = Loader::default();
        let result = loader
            .from_element::<SoftwareContext>("anything")
            .now_or_never()
            .expect("ready");
        assert_eq!(
            result.unwrap_err(),
            LoadError::SourceNotFound("anything".to_string())
        );
    }

    #[test]
    fn resolves_once() {
        let loader = Loader::default();
        let mut acquire = loader.from_element::<SoftwareContext>("x");
        assert!(!acquire.is_terminated());
        assert!((&mut acquire).now_or_never().is_some());
        assert!(acquire.is_terminated());
    }

    #[test]
    #[should_panic(expected = "polled after it resolved")]
    fn polling_after_resolution_panics() {
        let loader = Loader::default();
        let mut acquire = loader.from_element::<SoftwareContext>("x");
        let _ = (&mut acquire).now_or_never();
        let _ = acquire.now_or_never();
    }

    #[test]
    fn undecodable_data_is_load_failed() {
        let loader = Loader::default();
        let result = test_executors::spin_on(
            loader.load::<SoftwareContext>("data:text/plain,not%20a%20png"),
        );
        assert_eq!(result.unwrap_err(), LoadError::LoadFailed);
    }
}
