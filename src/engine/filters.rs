use crate::dom::Document;
use crate::state::{ColorFilters, Contrast, Saturation};

use super::Engine;

/// The `filter` value for `filters`, rebuilt from scratch every time.
/// Order is fixed: invert, grayscale, saturate, contrast.
pub fn filter_value(filters: &ColorFilters) -> Option<String> {
    let mut parts = Vec::with_capacity(4);
    if filters.invert {
        parts.push("invert(1)");
    }
    if filters.grayscale {
        parts.push("grayscale(1)");
    }
    match filters.saturation {
        Saturation::Low => parts.push("saturate(20%)"),
        Saturation::High => parts.push("saturate(200%)"),
        Saturation::Default => {}
    }
    match filters.contrast {
        Contrast::Low => parts.push("contrast(0.5)"),
        Contrast::High => parts.push("contrast(1.5)"),
        Contrast::Extra => parts.push("contrast(2)"),
        Contrast::Default => {}
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

impl Engine {
    pub fn apply_color_filters(&mut self, doc: &mut Document, filters: &ColorFilters) {
        let Some(root) = doc.document_element() else {
            return;
        };
        let result = match filter_value(filters) {
            Some(value) => self.root_styles.write(doc, root, "filter", &value),
            None => self.root_styles.restore(doc, root, "filter"),
        };
        if let Err(err) = result {
            tracing::warn!(target: "a11y::engine", error = %err, "failed to update color filters");
        }
    }
}
