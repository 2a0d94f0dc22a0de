use std::collections::HashMap;

use crate::dom::{Document, NodeId};

use super::root_style::InlineSnapshot;
use super::{excluded, is_document_shell, log_skip, markers, Engine};

const PROPERTY: &str = "background-image";

/// Elements whose CSS background image is forced to `none`, with the inline
/// declaration each one had before.
#[derive(Debug, Default)]
pub(crate) struct BackgroundSuppression {
    active: bool,
    tracked: HashMap<NodeId, Option<InlineSnapshot>>,
}

impl BackgroundSuppression {
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub(crate) fn is_tracked(&self, node: NodeId) -> bool {
        self.tracked.contains_key(&node)
    }

    /// Forces `background-image: none !important` on every element under
    /// `scope` whose computed background names a `url(...)`.
    pub(crate) fn suppress(&mut self, doc: &mut Document, scope: NodeId) {
        if excluded(doc, scope, Some(markers::PRESERVE_IMAGES)) {
            return;
        }
        let mut candidates = Vec::new();
        doc.walk_elements(
            scope,
            |node| {
                !doc.has_attribute(node, markers::WIDGET_OWNED)
                    && !doc.has_attribute(node, markers::PRESERVE_IMAGES)
            },
            |node| candidates.push(node),
        );

        for node in candidates {
            if is_document_shell(doc, node) || self.tracked.contains_key(&node) {
                continue;
            }
            let computed = match doc.computed_style(node, PROPERTY) {
                Ok(value) => value,
                Err(err) => {
                    log_skip("hide-images", node, &err);
                    continue;
                }
            };
            if !computed.to_ascii_lowercase().contains("url(") {
                continue;
            }
            let snapshot = InlineSnapshot::capture(doc, node, PROPERTY);
            match doc.set_style_property(node, PROPERTY, "none", true) {
                Ok(()) => {
                    self.tracked.insert(node, snapshot);
                }
                Err(err) => log_skip("hide-images", node, &err),
            }
        }
    }

    fn restore_all(&mut self, doc: &mut Document) {
        for (node, snapshot) in self.tracked.drain() {
            if let Err(err) = InlineSnapshot::restore(snapshot.as_ref(), doc, node, PROPERTY) {
                log_skip("hide-images", node, &err);
            }
        }
    }

    pub(crate) fn release(&mut self, doc: &mut Document, scope: NodeId) {
        let released: Vec<NodeId> = self
            .tracked
            .keys()
            .copied()
            .filter(|node| doc.contains(scope, *node))
            .collect();
        for node in released {
            if let Some(snapshot) = self.tracked.remove(&node) {
                if let Err(err) = InlineSnapshot::restore(snapshot.as_ref(), doc, node, PROPERTY) {
                    log_skip("hide-images", node, &err);
                }
            }
        }
    }
}

impl Engine {
    pub fn set_hide_images(&mut self, doc: &mut Document, active: bool) {
        if let Some(root) = doc.document_element() {
            if let Err(err) = doc.toggle_class(root, markers::HIDE_IMAGES_CLASS, active) {
                log_skip("hide-images", root, &err);
            }
        }
        if active == self.images.active {
            return;
        }
        self.images.active = active;
        if active {
            if let Some(scope) = doc.document_element() {
                self.images.suppress(doc, scope);
            }
            tracing::debug!(
                target: "a11y::engine",
                tracked = self.images.tracked_count(),
                "background images suppressed"
            );
        } else {
            self.images.restore_all(doc);
        }
    }
}
