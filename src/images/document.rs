// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Host document lookup.

Element-backed textures find their pixels by identifier.  The element found is a wrapper; the
pixels come from its renderable child (the canvas inside a container, the video inside a
player, and so on).

[MemoryDocument] is a document kept entirely in process, suitable for native hosts and tests.
*/

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use crate::images::source::LiveSource;

/// An element that may wrap a renderable child.
pub trait Element: Send + Sync + Debug {
    /// The child whose pixels should be sampled, if any.
    fn renderable_child(&self) -> Option<Arc<dyn LiveSource>>;
}

/// Lookup of elements by identifier.
pub trait Document: Send + Sync + Debug {
    fn element_by_id(&self, id: &str) -> Option<Arc<dyn Element>>;
}

/// An element that wraps at most one live source.
#[derive(Debug, Default)]
pub struct MemoryElement {
    child: Option<Arc<dyn LiveSource>>,
}

impl MemoryElement {
    /// An element with no renderable content, like an empty `div`.
    pub fn empty() -> Self {
        MemoryElement { child: None }
    }

    pub fn wrapping(child: Arc<dyn LiveSource>) -> Self {
        MemoryElement { child: Some(child) }
    }
}

impl Element for MemoryElement {
    fn renderable_child(&self) -> Option<Arc<dyn LiveSource>> {
        self.child.clone()
    }
}

/// An in-process document.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    elements: Mutex<HashMap<String, Arc<dyn Element>>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `element` under `id`, returning whatever was there before.
    pub fn insert(
        &self,
        id: impl Into<String>,
        element: Arc<dyn Element>,
    ) -> Option<Arc<dyn Element>> {
        self.elements.lock().unwrap().insert(id.into(), element)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<dyn Element>> {
        self.elements.lock().unwrap().remove(id)
    }
}

impl Document for MemoryDocument {
    fn element_by_id(&self, id: &str) -> Option<Arc<dyn Element>> {
        self.elements.lock().unwrap().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::source::{ElementKind, Frame, Surface};

    #[test]
    fn lookup() {
        let document = MemoryDocument::new();
        let canvas = Arc::new(Surface::new(ElementKind::Canvas, Frame::filled(2, 2, [0; 4])));
        document.insert("wrapper", Arc::new(MemoryElement::wrapping(canvas)));
        document.insert("empty", Arc::new(MemoryElement::empty()));

        let child = document
            .element_by_id("wrapper")
            .and_then(|e| e.renderable_child())
            .expect("child");
        assert_eq!(child.kind(), ElementKind::Canvas);
        assert!(document.element_by_id("empty").unwrap().renderable_child().is_none());
        assert!(document.element_by_id("missing").is_none());

        assert!(document.remove("wrapper").is_some());
        assert!(document.element_by_id("wrapper").is_none());
    }
}
