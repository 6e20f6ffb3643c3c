// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Keeping element-backed textures in sync with their source.

A texture bound from a live element can ask to be refreshed.  The [RefreshScheduler] then runs on
the rendering context's own thread, and on every tick it re-binds the native texture and uploads
whatever the element currently shows.

Ticks never re-validate or re-allocate.  The texture keeps the size it was acquired with, and
mipmaps are not rebuilt; only level 0 is rewritten.  The one exception is a texture whose first
upload failed at bind time: its mipmaps are built once, after the first tick that uploads.

There is no stop handle.  A scheduler runs until the context's [FrameClock](crate::context::FrameClock)
is closed, which is what tearing a context down does.
*/

use std::sync::Arc;
use std::time::Duration;

use crate::context::{GpuError, RenderingContext};
use crate::images::source::{LiveSource, SourceError};
use crate::sys::time::Instant;

/// How often a live texture is re-uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cadence {
    /// Never; the texture keeps its first upload.
    #[default]
    Static,
    /// On a recurring timer.
    Interval(Duration),
    /// Once per frame presented by the rendering context.
    EveryFrame,
}

impl Cadence {
    /**
    Interprets a signed cadence value.

    Positive values are a period in milliseconds, negative values follow the display, and zero
    is static.

    ```
    use std::time::Duration;
    use texture_acquire::bindings::refresh::Cadence;

    assert_eq!(Cadence::from_millis(33), Cadence::Interval(Duration::from_millis(33)));
    assert_eq!(Cadence::from_millis(-1), Cadence::EveryFrame);
    assert_eq!(Cadence::from_millis(0), Cadence::Static);
    ```
    */
    pub fn from_millis(cadence: i64) -> Self {
        match cadence {
            0 => Cadence::Static,
            c if c > 0 => Cadence::Interval(Duration::from_millis(c as u64)),
            _ => Cadence::EveryFrame,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Cadence::Static)
    }
}

/// Re-uploads a live source into an existing native texture.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    source: Arc<dyn LiveSource>,
    flip_vertical: bool,
    cadence: Cadence,
    label: String,
    mipmaps_pending: bool,
}

impl RefreshScheduler {
    pub fn new(
        source: Arc<dyn LiveSource>,
        flip_vertical: bool,
        cadence: Cadence,
        label: impl Into<String>,
    ) -> Self {
        RefreshScheduler {
            source,
            flip_vertical,
            cadence,
            label: label.into(),
            mipmaps_pending: false,
        }
    }

    /// Builds mipmaps after the first successful tick.  For textures whose bind-time upload
    /// never happened.
    pub fn with_mipmaps_pending(mut self, pending: bool) -> Self {
        self.mipmaps_pending = pending;
        self
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// One refresh: bind, upload the current frame, unbind.
    ///
    /// The texture is unbound even if the upload fails.
    pub fn tick<C: RenderingContext>(&self, context: &C, texture: &C::Texture) -> Result<(), GpuError> {
        context.bind_texture(Some(texture));
        context.set_flip_y(self.flip_vertical);
        let result = self
            .source
            .current_frame()
            .map_err(GpuError::from)
            .and_then(|frame| context.upload(&frame));
        context.bind_texture(None);
        result
    }

    fn build_mipmaps<C: RenderingContext>(&self, context: &C, texture: &C::Texture) -> Result<(), GpuError> {
        context.bind_texture(Some(texture));
        let result = context.generate_mipmaps();
        context.bind_texture(None);
        result
    }

    /// Starts refreshing `texture` on `context`'s thread.  Static cadences install nothing.
    pub fn install<C: RenderingContext>(self, context: &C, texture: C::Texture) {
        if !self.cadence.is_dynamic() {
            return;
        }
        logwise::info_sync!(
            "installing refresh for {label} at {cadence}",
            label = logwise::privacy::LogIt(&self.label),
            cadence = logwise::privacy::LogIt(&self.cadence)
        );
        let task_label = format!("refresh {}", self.label);
        let task = Box::pin(self.run(context.clone(), texture));
        context.spawn_local(&task_label, task);
    }

    async fn run<C: RenderingContext>(self, context: C, texture: C::Texture) {
        let clock = context.frame_clock().clone();
        let mut ticks: u64 = 0;
        let mut mipmaps_pending = self.mipmaps_pending;
        loop {
            let proceed = match self.cadence {
                Cadence::Static => false,
                Cadence::Interval(period) => {
                    portable_async_sleep::async_sleep(period).await;
                    !clock.is_closed()
                }
                Cadence::EveryFrame => clock.next_frame().await,
            };
            if !proceed {
                break;
            }
            let started = Instant::now();
            match self.tick(&context, &texture) {
                Ok(()) => {
                    ticks += 1;
                    if mipmaps_pending {
                        mipmaps_pending = false;
                        if let Err(e) = self.build_mipmaps(&context, &texture) {
                            logwise::warn_sync!(
                                "building mipmaps for {label} failed: {err}",
                                label = logwise::privacy::LogIt(&self.label),
                                err = logwise::privacy::LogIt(&e)
                            );
                        }
                    }
                    logwise::trace_sync!(
                        "refreshed {label} in {elapsed}",
                        label = logwise::privacy::LogIt(&self.label),
                        elapsed = logwise::privacy::LogIt(&started.elapsed())
                    );
                }
                //a video between frames, nothing to say
                Err(GpuError::Source(SourceError::NotReady)) => {
                    logwise::trace_sync!(
                        "{label} has no frame yet",
                        label = logwise::privacy::LogIt(&self.label)
                    );
                }
                Err(e) => {
                    logwise::warn_sync!(
                        "skipping refresh of {label}: {err}",
                        label = logwise::privacy::LogIt(&self.label),
                        err = logwise::privacy::LogIt(&e)
                    );
                }
            }
        }
        logwise::info_sync!(
            "refresh for {label} stopped after {ticks} uploads",
            label = logwise::privacy::LogIt(&self.label),
            ticks = ticks
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::sampler::SamplingOptions;
    use crate::context::TextureDescriptor;
    use crate::context::software::{Call, SoftwareContext};
    use crate::images::source::{ElementKind, Frame, Surface};

    fn setup(cadence: Cadence) -> (SoftwareContext, Arc<Surface>, RefreshScheduler) {
        let surface = Arc::new(Surface::new(
            ElementKind::Canvas,
            Frame::filled(2, 2, [1, 2, 3, 4]),
        ));
        let scheduler = RefreshScheduler::new(surface.clone(), false, cadence, "canvas");
        (SoftwareContext::new(), surface, scheduler)
    }

    #[test]
    fn cadence_sign() {
        assert_eq!(Cadence::from_millis(i64::MIN), Cadence::EveryFrame);
        assert!(Cadence::from_millis(1).is_dynamic());
        assert!(!Cadence::default().is_dynamic());
    }

    #[test]
    fn tick_unbinds_after_failure() {
        let (context, surface, scheduler) = setup(Cadence::EveryFrame);
        let texture = context.create_texture(&TextureDescriptor::new(
            "t",
            2,
            2,
            &SamplingOptions::NON_POWER_OF_TWO,
        ));
        surface.present(Frame::filled(4, 4, [0; 4]));
        assert!(matches!(
            scheduler.tick(&context, &texture),
            Err(GpuError::SizeMismatch { .. })
        ));
        assert_eq!(context.bound(), None);
        assert_eq!(context.calls().last(), Some(&Call::BindTexture(None)));
    }

    #[test]
    fn static_installs_nothing() {
        let (context, _surface, scheduler) = setup(Cadence::Static);
        let texture = context.create_texture(&TextureDescriptor::new(
            "t",
            2,
            2,
            &SamplingOptions::NON_POWER_OF_TWO,
        ));
        scheduler.install(&context, texture.clone());
        context.present_frame();
        context.present_frame();
        assert_eq!(texture.upload_count(), 0);
    }

    #[test]
    fn every_frame_until_teardown() {
        let (context, _surface, scheduler) = setup(Cadence::EveryFrame);
        let texture = context.create_texture(&TextureDescriptor::new(
            "t",
            2,
            2,
            &SamplingOptions::NON_POWER_OF_TWO,
        ));
        scheduler.install(&context, texture.clone());
        context.run_until_stalled();
        assert_eq!(texture.upload_count(), 0);
        for _ in 0..3 {
            context.present_frame();
        }
        assert_eq!(texture.upload_count(), 3);
        context.teardown();
        context.present_frame();
        assert_eq!(texture.upload_count(), 3);
    }
}
