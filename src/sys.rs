// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

//! System abstractions for cross-platform compatibility.
//!
//! This module provides platform-specific implementations of system functionality
//! that differs between native and WASM targets.

pub mod time {
    //! Time abstractions for cross-platform compatibility.
    //!
    //! On native platforms, this re-exports `std::time` types.
    //! On WASM platforms, this re-exports `web_time` types for compatibility.

    #[cfg(not(target_arch = "wasm32"))]
    pub use std::time::Instant;

    #[cfg(target_arch = "wasm32")]
    pub use web_time::Instant;
}

/// Schedules `callback` for the browser's next repaint.
///
/// Without a window (a worker, say) there is no display to follow, so the request is logged and
/// dropped.
#[cfg(target_arch = "wasm32")]
pub(crate) fn request_animation_frame<F>(callback: F)
where
    F: FnOnce() + 'static,
{
    use web_sys::wasm_bindgen::JsCast;
    use web_sys::wasm_bindgen::closure::Closure;
    let Some(window) = web_sys::window() else {
        logwise::warn_sync!("no window; animation frames will not be delivered");
        return;
    };
    if let Err(e) =
        window.request_animation_frame(Closure::once_into_js(callback).as_ref().unchecked_ref())
    {
        logwise::error_sync!(
            "request_animation_frame failed: {err}",
            err = logwise::privacy::LogIt(&e)
        );
    }
}
