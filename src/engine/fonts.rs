use std::collections::HashMap;

use crate::dom::{format_px, DomError, Document, NodeId};
use crate::state::{Cycle, FontScale};

use super::root_style::InlineSnapshot;
use super::{excluded, is_document_shell, log_skip, markers, Engine};

const PROPERTY: &str = "font-size";

/// Tags that never render text of their own.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "meta", "title", "link"];

#[derive(Debug, Clone)]
struct FontRecord {
    /// Computed size with the widget's scale divided out.
    baseline_px: f64,
    prior: Option<InlineSnapshot>,
}

#[derive(Debug, Default)]
pub(crate) struct FontRegistry {
    scale: FontScale,
    records: HashMap<NodeId, FontRecord>,
}

impl FontRegistry {
    pub(crate) fn is_active(&self) -> bool {
        !self.scale.is_default()
    }

    pub(crate) fn tracked_count(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_tracked(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    fn is_target(doc: &Document, node: NodeId) -> bool {
        if is_document_shell(doc, node) {
            return false;
        }
        match doc.tag_name(node) {
            Some(tag) if SKIP_TAGS.contains(&tag) => false,
            Some(_) => doc.has_direct_text(node),
            None => false,
        }
    }

    /// Records a baseline for every text-bearing element under `scope` that
    /// is not registered yet. Returns the newly registered nodes.
    ///
    /// All baselines are read before any override is written, otherwise a
    /// child would inherit its parent's scaled size into its own baseline.
    fn register(&mut self, doc: &mut Document, scope: NodeId) -> Vec<NodeId> {
        if excluded(doc, scope, None) {
            return Vec::new();
        }
        let mut candidates = Vec::new();
        doc.walk_elements(
            scope,
            |node| !doc.has_attribute(node, markers::WIDGET_OWNED),
            |node| {
                if Self::is_target(doc, node) {
                    candidates.push(node);
                }
            },
        );

        let mut registered = Vec::new();
        for node in candidates {
            if self.records.contains_key(&node) {
                continue;
            }
            let computed = match self.unscaled_font_size(doc, node) {
                Ok(size) if size > 0.0 => size,
                Ok(_) => continue,
                Err(err) => {
                    log_skip("font-scale", node, &err);
                    continue;
                }
            };
            self.records.insert(
                node,
                FontRecord {
                    baseline_px: computed,
                    prior: InlineSnapshot::capture(doc, node, PROPERTY),
                },
            );
            registered.push(node);
        }
        registered
    }

    /// Computed size of `node` with the active scale divided out: overrides
    /// on registered ancestors are lifted for the measurement and put back
    /// afterwards.
    fn unscaled_font_size(&self, doc: &mut Document, node: NodeId) -> Result<f64, DomError> {
        let mut lifted = Vec::new();
        let mut cursor = doc.parent_element(node);
        while let Some(ancestor) = cursor {
            if let Some(record) = self.records.get(&ancestor) {
                if InlineSnapshot::restore(record.prior.as_ref(), doc, ancestor, PROPERTY).is_ok() {
                    lifted.push(ancestor);
                }
            }
            cursor = doc.parent_element(ancestor);
        }
        let measured = doc.computed_font_size(node);
        if let Some(factor) = self.scale.factor() {
            for ancestor in lifted {
                self.apply(doc, ancestor, factor);
            }
        }
        measured
    }

    fn apply(&self, doc: &mut Document, node: NodeId, factor: f64) {
        let Some(record) = self.records.get(&node) else {
            return;
        };
        let size = format_px(record.baseline_px * factor);
        if let Err(err) = doc.set_style_property(node, PROPERTY, &size, true) {
            log_skip("font-scale", node, &err);
        }
    }

    pub(crate) fn register_and_apply(&mut self, doc: &mut Document, scope: NodeId) {
        let Some(factor) = self.scale.factor() else {
            return;
        };
        for node in self.register(doc, scope) {
            self.apply(doc, node, factor);
        }
    }

    fn restore(doc: &mut Document, node: NodeId, record: &FontRecord) {
        if let Err(err) = InlineSnapshot::restore(record.prior.as_ref(), doc, node, PROPERTY) {
            log_skip("font-scale", node, &err);
        }
    }

    pub(crate) fn release(&mut self, doc: &mut Document, scope: NodeId) {
        let released: Vec<NodeId> = self
            .records
            .keys()
            .copied()
            .filter(|node| doc.contains(scope, *node))
            .collect();
        for node in released {
            if let Some(record) = self.records.remove(&node) {
                Self::restore(doc, node, &record);
            }
        }
    }

    fn set_scale(&mut self, doc: &mut Document, scale: FontScale) {
        match scale.factor() {
            Some(factor) => {
                if self.records.is_empty() || self.scale.is_default() {
                    if let Some(scope) = Engine::scan_root(doc) {
                        self.register(doc, scope);
                    }
                }
                self.scale = scale;
                let nodes: Vec<NodeId> = self.records.keys().copied().collect();
                for node in nodes {
                    if doc.is_connected(node) {
                        self.apply(doc, node, factor);
                    } else if let Some(record) = self.records.remove(&node) {
                        Self::restore(doc, node, &record);
                    }
                }
            }
            None => {
                self.scale = scale;
                for (node, record) in std::mem::take(&mut self.records) {
                    Self::restore(doc, node, &record);
                }
            }
        }
    }
}

impl Engine {
    /// Scales every registered text element to `baseline × factor`, or
    /// removes the overrides when `scale` is unset.
    pub fn set_font_scale(&mut self, doc: &mut Document, scale: FontScale) {
        if scale == self.fonts.scale {
            return;
        }
        self.fonts.set_scale(doc, scale);
        if let Some(root) = doc.document_element() {
            let result = match scale.factor() {
                Some(factor) => {
                    doc.set_attribute(root, markers::FONT_SCALE_ATTR, &factor.to_string())
                }
                None => doc.remove_attribute(root, markers::FONT_SCALE_ATTR),
            };
            if let Err(err) = result {
                log_skip("font-scale", root, &err);
            }
        }
    }

    pub fn font_scale(&self) -> FontScale {
        self.fonts.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> (Document, NodeId, NodeId) {
        let doc = Document::parse_html(
            "<style>h1 { font-size: 2em }</style><h1 id=title>Title <span id=inner>nested</span></h1>\
             <p id=body style=\"font-size: 12px\">Body</p><script>var x = 1;</script><div id=empty> </div>",
        );
        let title = doc.element_by_id("title").unwrap();
        let body = doc.element_by_id("body").unwrap();
        (doc, title, body)
    }

    #[test]
    fn registers_text_bearing_elements_only() {
        let (mut doc, _, _) = page();
        let mut engine = Engine::new();
        engine.set_font_scale(&mut doc, FontScale::LARGE);
        let empty = doc.element_by_id("empty").unwrap();
        let script = doc.elements_by_tag(doc.root(), "script")[0];
        assert!(!engine.fonts.is_tracked(empty));
        assert!(!engine.fonts.is_tracked(script));
        assert!(!engine.fonts.is_tracked(doc.body().unwrap()));
        assert_eq!(engine.fonts.tracked_count(), 3);
    }

    #[test]
    fn nested_elements_do_not_compound() {
        let (mut doc, title, _) = page();
        let inner = doc.element_by_id("inner").unwrap();
        let mut engine = Engine::new();
        engine.set_font_scale(&mut doc, FontScale::LARGER);
        assert_eq!(doc.style_property(title, PROPERTY).as_deref(), Some("48px"));
        assert_eq!(doc.style_property(inner, PROPERTY).as_deref(), Some("48px"));
    }

    #[test]
    fn reset_restores_prior_inline_value() {
        let (mut doc, title, body) = page();
        let mut engine = Engine::new();
        engine.set_font_scale(&mut doc, FontScale::LARGEST);
        assert_eq!(doc.style_property(body, PROPERTY).as_deref(), Some("21.6px"));
        assert!(doc.style_is_important(body, PROPERTY));

        engine.set_font_scale(&mut doc, FontScale::UNSET);
        assert_eq!(doc.attribute(body, "style"), Some("font-size: 12px;"));
        assert!(!doc.has_attribute(title, "style"));
        assert_eq!(engine.fonts.tracked_count(), 0);
        let html = doc.document_element().unwrap();
        assert!(!doc.has_attribute(html, markers::FONT_SCALE_ATTR));
    }
}
