//! Root-level markers. Nothing here needs per-element tracking: the current
//! enum value fully describes what the root carries.

use crate::dom::{DomError, Document};
use crate::state::{Cycle, LetterSpacing, LineHeight, LinkStyle, TextAlign};

use super::{log_skip, markers, Engine};

fn select_class(
    doc: &mut Document,
    classes: &[&str],
    selected: Option<usize>,
) -> Result<(), DomError> {
    let Some(root) = doc.document_element() else {
        return Ok(());
    };
    for (index, class) in classes.iter().enumerate() {
        doc.toggle_class(root, class, selected == Some(index))?;
    }
    Ok(())
}

fn report(effect: &str, doc: &Document, result: Result<(), DomError>) {
    if let (Err(err), Some(root)) = (result, doc.document_element()) {
        log_skip(effect, root, &err);
    }
}

impl Engine {
    pub fn set_line_height(&mut self, doc: &mut Document, value: LineHeight) {
        let result = select_class(doc, &markers::LINE_HEIGHT_CLASSES, value.progress_index());
        report("line-height", doc, result);
    }

    pub fn set_link_style(&mut self, doc: &mut Document, value: LinkStyle) {
        let result = select_class(doc, &markers::UNDERLINE_CLASSES, value.index());
        report("link-style", doc, result);
    }

    pub fn set_letter_spacing(&mut self, doc: &mut Document, value: LetterSpacing) {
        let Some(root) = doc.document_element() else {
            return;
        };
        let result = match value {
            LetterSpacing::Default => self.root_styles.restore(doc, root, "letter-spacing"),
            other => self
                .root_styles
                .write(doc, root, "letter-spacing", other.css_value()),
        };
        report("letter-spacing", doc, result);
    }

    /// Writes both the attribute and its dataset mirror, so a host script
    /// clearing one of them does not drop the alignment.
    pub fn set_text_align(&mut self, doc: &mut Document, value: TextAlign) {
        let Some(root) = doc.document_element() else {
            return;
        };
        let result = match value {
            TextAlign::Unset => doc
                .remove_attribute(root, markers::TEXT_ALIGN_ATTR)
                .and_then(|()| doc.remove_dataset(root, markers::TEXT_ALIGN_DATASET)),
            other => doc
                .set_attribute(root, markers::TEXT_ALIGN_ATTR, other.as_str())
                .and_then(|()| doc.set_dataset(root, markers::TEXT_ALIGN_DATASET, other.as_str())),
        };
        report("text-align", doc, result);
    }

    /// Alignment currently on the root, preferring the dataset mirror.
    pub fn document_text_align(doc: &Document) -> TextAlign {
        let Some(root) = doc.document_element() else {
            return TextAlign::Unset;
        };
        [
            doc.dataset(root, markers::TEXT_ALIGN_DATASET),
            doc.attribute(root, markers::TEXT_ALIGN_ATTR),
        ]
        .into_iter()
        .flatten()
        .map(TextAlign::parse)
        .find(|align| *align != TextAlign::Unset)
        .unwrap_or_default()
    }

    pub fn set_dyslexia_font(&mut self, doc: &mut Document, active: bool) {
        let Some(root) = doc.document_element() else {
            return;
        };
        let result = if active {
            doc.set_attribute(root, markers::DYSLEXIA_ATTR, "true")
        } else {
            doc.remove_attribute(root, markers::DYSLEXIA_ATTR)
        };
        report("dyslexia-font", doc, result);
    }

    pub fn set_hide_video(&mut self, doc: &mut Document, active: bool) {
        let Some(root) = doc.document_element() else {
            return;
        };
        let result = doc.toggle_class(root, markers::HIDE_VIDEO_CLASS, active);
        report("hide-video", doc, result);
    }
}
