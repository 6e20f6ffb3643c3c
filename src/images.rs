// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Where pixels come from, and turning them into textures. */

pub mod source;
pub mod document;
pub mod fetch;
pub mod decode;
pub mod loader;

pub use loader::{Acquire, LoadError, Loader, LoaderConfig};
