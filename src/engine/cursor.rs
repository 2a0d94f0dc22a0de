use crate::dom::{format_px, DomError, Document, NodeId};
use crate::state::{CursorStyle, Cycle};

use super::{log_skip, markers, Engine};

const OVERLAY_CLASSES: [&str; 3] = ["cursor-0", "cursor-1", "cursor-2"];
const FOCUS_SIZE: &str = "50px";
const FOCUS_HOVER_SIZE: &str = "100px";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

/// Horizontal position of the guide beam, kept inside
/// `[width / 8, width - width / 8]`.
pub fn guide_beam_left(pointer_x: f64, viewport_width: f64) -> f64 {
    let margin = viewport_width / 8.0;
    if pointer_x < margin {
        margin
    } else if pointer_x > viewport_width - margin {
        viewport_width - margin
    } else {
        pointer_x
    }
}

#[derive(Debug, Default)]
pub(crate) struct CursorOverlay {
    style: CursorStyle,
}

fn overlays(doc: &Document) -> (Option<NodeId>, Option<NodeId>) {
    (
        doc.element_by_id(markers::CURSOR_ID),
        doc.element_by_id(markers::TRIANGLE_CURSOR_ID),
    )
}

fn set_size(doc: &mut Document, node: NodeId, width: &str, height: &str) -> Result<(), DomError> {
    doc.set_style_property(node, "width", width, false)?;
    doc.set_style_property(node, "height", height, false)
}

impl Engine {
    /// Switches the overlay treatment. Only the guide beam hides the native
    /// cursor.
    pub fn set_cursor_style(&mut self, doc: &mut Document, style: CursorStyle) {
        self.cursor.style = style;
        let (cursor, triangle) = overlays(doc);

        if let Some(cursor) = cursor {
            let result = (|| -> Result<(), DomError> {
                let selected = style.progress_index();
                for (index, class) in OVERLAY_CLASSES.iter().enumerate() {
                    doc.toggle_class(cursor, class, selected == Some(index))?;
                }
                match style {
                    CursorStyle::Default => set_size(doc, cursor, "", ""),
                    CursorStyle::Focus => set_size(doc, cursor, FOCUS_SIZE, FOCUS_SIZE),
                    CursorStyle::Mask => set_size(doc, cursor, "100%", "15vh"),
                    CursorStyle::Guide => set_size(doc, cursor, "25vw", "8px"),
                }
            })();
            if let Err(err) = result {
                log_skip("cursor", cursor, &err);
            }
        }

        if let Some(triangle) = triangle {
            let display = if style == CursorStyle::Guide { "block" } else { "none" };
            if let Err(err) = doc.set_style_property(triangle, "display", display, false) {
                log_skip("cursor", triangle, &err);
            }
        }

        if let Some(root) = doc.document_element() {
            let result = if style == CursorStyle::Guide {
                self.root_styles.write(doc, root, "cursor", "none")
            } else {
                self.root_styles.restore(doc, root, "cursor")
            };
            if let Err(err) = result {
                log_skip("cursor", root, &err);
            }
        }
    }

    pub fn cursor_style(&self) -> CursorStyle {
        self.cursor.style
    }

    /// Moves the overlay after the pointer.
    pub fn pointer_moved(&mut self, doc: &mut Document, pointer: PointerPosition) {
        let (Some(cursor), triangle) = overlays(doc) else {
            return;
        };
        let width = doc.viewport().width;
        let top = format_px(pointer.y);
        let result = (|| -> Result<(), DomError> {
            match self.cursor.style {
                CursorStyle::Default => Ok(()),
                CursorStyle::Focus => {
                    doc.set_style_property(cursor, "top", &top, false)?;
                    doc.set_style_property(cursor, "left", &format_px(pointer.x), false)
                }
                CursorStyle::Mask => {
                    doc.set_style_property(cursor, "top", &top, false)?;
                    doc.set_style_property(cursor, "left", "0", false)
                }
                CursorStyle::Guide => {
                    let left = guide_beam_left(pointer.x, width);
                    doc.set_style_property(cursor, "top", &top, false)?;
                    doc.set_style_property(cursor, "left", &format_px(left), false)?;
                    if let Some(triangle) = triangle {
                        doc.set_style_property(triangle, "top", &top, false)?;
                        doc.set_style_property(triangle, "left", &format_px(pointer.x), false)?;
                    }
                    Ok(())
                }
            }
        })();
        if let Err(err) = result {
            log_skip("cursor", cursor, &err);
        }
    }

    /// Grows the focus halo while the pointer is over a link or button.
    pub fn pointer_hovered(&mut self, doc: &mut Document, target: NodeId, entering: bool) {
        if self.cursor.style != CursorStyle::Focus || !is_interactive(doc, target) {
            return;
        }
        let Some(cursor) = doc.element_by_id(markers::CURSOR_ID) else {
            return;
        };
        let size = if entering { FOCUS_HOVER_SIZE } else { FOCUS_SIZE };
        if let Err(err) = set_size(doc, cursor, size, size) {
            log_skip("cursor", cursor, &err);
        }
    }
}

fn is_interactive(doc: &Document, target: NodeId) -> bool {
    let mut cursor = Some(target);
    while let Some(node) = cursor {
        if matches!(doc.tag_name(node), Some("a") | Some("button")) {
            return true;
        }
        cursor = doc.parent_element(node);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Viewport;

    fn page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::parse_html(
            "<a id=link href=#><span id=label>Go</span></a>\
             <div id=cursor data-a11y-stiac-widget></div><div id=triangle-cursor data-a11y-stiac-widget></div>",
        );
        doc.set_viewport(Viewport { width: 800.0, height: 600.0 });
        let cursor = doc.element_by_id("cursor").unwrap();
        let triangle = doc.element_by_id("triangle-cursor").unwrap();
        (doc, cursor, triangle)
    }

    #[test]
    fn beam_is_clamped_to_guide_band() {
        assert_eq!(guide_beam_left(10.0, 800.0), 100.0);
        assert_eq!(guide_beam_left(790.0, 800.0), 700.0);
        assert_eq!(guide_beam_left(400.0, 800.0), 400.0);
    }

    #[test]
    fn guide_hides_native_cursor_and_tracks_pointer() {
        let (mut doc, cursor, triangle) = page();
        let html = doc.document_element().unwrap();
        let mut engine = Engine::new();
        engine.set_cursor_style(&mut doc, CursorStyle::Guide);
        assert!(doc.has_class(cursor, "cursor-2"));
        assert_eq!(doc.style_property(html, "cursor").as_deref(), Some("none"));
        assert_eq!(doc.style_property(triangle, "display").as_deref(), Some("block"));

        engine.pointer_moved(&mut doc, PointerPosition { x: 20.0, y: 33.0 });
        assert_eq!(doc.style_property(cursor, "left").as_deref(), Some("100px"));
        assert_eq!(doc.style_property(triangle, "left").as_deref(), Some("20px"));
        assert_eq!(doc.style_property(cursor, "top").as_deref(), Some("33px"));

        engine.set_cursor_style(&mut doc, CursorStyle::Default);
        assert!(!doc.has_class(cursor, "cursor-2"));
        assert_eq!(doc.style_property(html, "cursor"), None);
        assert_eq!(doc.style_property(triangle, "display").as_deref(), Some("none"));
        assert_eq!(doc.style_property(cursor, "width"), None);
    }

    #[test]
    fn focus_halo_grows_over_links() {
        let (mut doc, cursor, _) = page();
        let label = doc.element_by_id("label").unwrap();
        let mut engine = Engine::new();
        engine.set_cursor_style(&mut doc, CursorStyle::Focus);
        engine.pointer_hovered(&mut doc, label, true);
        assert_eq!(doc.style_property(cursor, "width").as_deref(), Some("100px"));
        engine.pointer_hovered(&mut doc, label, false);
        assert_eq!(doc.style_property(cursor, "height").as_deref(), Some("50px"));

        engine.set_cursor_style(&mut doc, CursorStyle::Mask);
        engine.pointer_moved(&mut doc, PointerPosition { x: 300.0, y: 40.0 });
        assert_eq!(doc.style_property(cursor, "left").as_deref(), Some("0"));
        assert_eq!(doc.style_property(cursor, "width").as_deref(), Some("100%"));
    }
}
