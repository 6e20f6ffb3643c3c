// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Pixel sources.

Every source is normalized into a [Frame]: tightly packed RGBA8 rows, top row first.

Fetched images produce exactly one frame.  Live sources (canvas, video, and friends hosted in a
[Document](crate::images::document::Document)) implement [LiveSource] and may produce a
different frame every time they are asked.
*/

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("source has no frame available yet")]
    NotReady,
}

/// A snapshot of pixel content.
///
/// Cloning is cheap; the pixels are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SourceError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(SourceError::BufferSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Frame {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// A frame where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL)
            .collect();
        Frame {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn bytes_per_row(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// The pixel at `(x, y)`, with `y = 0` the top row.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.bytes_per_row() + x as usize * BYTES_PER_PIXEL;
        let p = &self.pixels[offset..offset + BYTES_PER_PIXEL];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Pixel rows in upload order.
    ///
    /// With `flip` the bottom row comes first.
    pub fn rows_for_upload(&self, flip: bool) -> Vec<u8> {
        if !flip {
            return self.pixels.to_vec();
        }
        let row = self.bytes_per_row();
        let mut out = Vec::with_capacity(self.pixels.len());
        if row == 0 {
            return out;
        }
        for chunk in self.pixels.chunks_exact(row).rev() {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("byte_len", &self.pixels.len())
            .finish()
    }
}

/// The kind of element backing a live source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Canvas,
    Video,
    Image,
    Svg,
}

/// Pixel content that can change over time.
///
/// Implementations are read from the loader (to size the texture) and later from whatever
/// thread owns the rendering context (to upload), so they must be shareable.
pub trait LiveSource: Send + Sync + Debug {
    fn kind(&self) -> ElementKind;
    /// Current dimensions.  For video or canvas these are the current frame's dimensions,
    /// which may differ from one call to the next.
    fn dimensions(&self) -> (u32, u32);
    fn current_frame(&self) -> Result<Frame, SourceError>;
}

/**
A live source that producers present frames into.

This stands in for a canvas or video element: some other part of the program draws or decodes
into it, and the texture that wraps it picks up whatever was presented most recently.
*/
#[derive(Debug)]
pub struct Surface {
    kind: ElementKind,
    state: Mutex<SurfaceState>,
}

#[derive(Debug)]
struct SurfaceState {
    width: u32,
    height: u32,
    frame: Option<Frame>,
    presented: u64,
}

impl Surface {
    /// A surface showing `frame`.
    pub fn new(kind: ElementKind, frame: Frame) -> Self {
        Surface {
            kind,
            state: Mutex::new(SurfaceState {
                width: frame.width(),
                height: frame.height(),
                frame: Some(frame),
                presented: 1,
            }),
        }
    }

    /// A surface with known dimensions but nothing presented yet, like a video before its
    /// first frame is decoded.
    pub fn unready(kind: ElementKind, width: u32, height: u32) -> Self {
        Surface {
            kind,
            state: Mutex::new(SurfaceState {
                width,
                height,
                frame: None,
                presented: 0,
            }),
        }
    }

    /// Replaces the visible content.  The surface takes on the frame's dimensions.
    pub fn present(&self, frame: Frame) {
        let mut state = self.state.lock().unwrap();
        state.width = frame.width();
        state.height = frame.height();
        state.frame = Some(frame);
        state.presented += 1;
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.state.lock().unwrap().presented
    }
}

impl LiveSource for Surface {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn dimensions(&self) -> (u32, u32) {
        let state = self.state.lock().unwrap();
        (state.width, state.height)
    }

    fn current_frame(&self) -> Result<Frame, SourceError> {
        self.state
            .lock()
            .unwrap()
            .frame
            .clone()
            .ok_or(SourceError::NotReady)
    }
}
