use std::collections::HashMap;

use crate::dom::{DomError, Document, NodeId};

/// An inline declaration as it was before the engine touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSnapshot {
    pub value: String,
    pub important: bool,
}

impl InlineSnapshot {
    pub fn capture(doc: &Document, node: NodeId, property: &str) -> Option<Self> {
        doc.inline_style(node).get(property).map(|declaration| Self {
            value: declaration.value.clone(),
            important: declaration.important,
        })
    }

    /// Puts `snapshot` back, or removes the property when there was none.
    pub fn restore(
        snapshot: Option<&Self>,
        doc: &mut Document,
        node: NodeId,
        property: &str,
    ) -> Result<(), DomError> {
        match snapshot {
            Some(saved) => doc.set_style_property(node, property, &saved.value, saved.important),
            None => doc.remove_style_property(node, property),
        }
    }
}

/// Inline properties the engine writes on `<html>`. The host's own value is
/// remembered on the first write and put back when the effect clears.
#[derive(Debug, Default)]
pub(crate) struct RootStyleGuard {
    saved: HashMap<&'static str, Option<InlineSnapshot>>,
}

impl RootStyleGuard {
    pub(crate) fn write(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        property: &'static str,
        value: &str,
    ) -> Result<(), DomError> {
        self.saved
            .entry(property)
            .or_insert_with(|| InlineSnapshot::capture(doc, root, property));
        doc.set_style_property(root, property, value, false)
    }

    pub(crate) fn restore(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        property: &'static str,
    ) -> Result<(), DomError> {
        match self.saved.remove(property) {
            Some(snapshot) => InlineSnapshot::restore(snapshot.as_ref(), doc, root, property),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self, property: &str) -> bool {
        self.saved.contains_key(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_host_value_and_priority() {
        let mut doc = Document::new();
        let html = doc.document_element().unwrap();
        doc.set_attribute(html, "style", "filter: blur(1px) !important").unwrap();

        let mut guard = RootStyleGuard::default();
        guard.write(&mut doc, html, "filter", "invert(1)").unwrap();
        guard.write(&mut doc, html, "filter", "grayscale(1)").unwrap();
        assert_eq!(doc.style_property(html, "filter").as_deref(), Some("grayscale(1)"));

        guard.restore(&mut doc, html, "filter").unwrap();
        assert_eq!(doc.attribute(html, "style"), Some("filter: blur(1px) !important;"));
        assert!(!guard.is_held("filter"));
    }

    #[test]
    fn removes_property_it_introduced() {
        let mut doc = Document::new();
        let html = doc.document_element().unwrap();
        let mut guard = RootStyleGuard::default();
        guard.write(&mut doc, html, "cursor", "none").unwrap();
        guard.restore(&mut doc, html, "cursor").unwrap();
        guard.restore(&mut doc, html, "cursor").unwrap();
        assert!(!doc.has_attribute(html, "style"));
    }
}
