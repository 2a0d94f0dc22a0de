use html_escape::{encode_double_quoted_attribute, encode_text};
use kuchiki::traits::*;
use kuchiki::{parse_html, NodeData, NodeRef};

use super::{Document, ElementData, NodeId, NodeKind, Playback};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Document {
    /// Parses a full HTML page. The parser always produces the
    /// `html`/`head`/`body` skeleton, even for fragments.
    pub fn parse_html(html: &str) -> Self {
        let parsed = parse_html().one(html);
        let mut document = Self::bare();
        let root = document.root;
        for child in parsed.children() {
            for id in document.import(&child) {
                document.attach_unobserved(root, id);
            }
        }
        document
    }

    /// Parses `html` as body content into detached nodes owned by this
    /// document and returns the top-level ones in order.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let parsed = parse_html().one(html);
        let Ok(body) = parsed.select_first("body") else {
            return Vec::new();
        };
        let mut roots = Vec::new();
        for child in body.as_node().children() {
            roots.extend(self.import(&child));
        }
        roots
    }

    /// Copies `source` into the arena. Document and fragment nodes dissolve
    /// into their children, so more than one id can come back.
    fn import(&mut self, source: &NodeRef) -> Vec<NodeId> {
        let id = match source.data() {
            NodeData::Element(data) => {
                let mut element = ElementData::new(data.name.local.as_ref());
                for (name, attribute) in data.attributes.borrow().map.iter() {
                    element.set_attribute(name.local.to_string(), attribute.value.clone());
                }
                let no_autoplay = element.attribute("autoplay").is_none();
                if let Some(Playback::Media { paused }) = element.playback.as_mut() {
                    *paused = no_autoplay;
                }
                self.push_node(NodeKind::Element(element))
            }
            NodeData::Text(text) => self.push_node(NodeKind::Text(text.borrow().clone())),
            NodeData::Comment(text) => self.push_node(NodeKind::Comment(text.borrow().clone())),
            NodeData::Document(_) | NodeData::DocumentFragment => {
                return source.children().flat_map(|child| self.import(&child)).collect();
            }
            NodeData::Doctype(_) | NodeData::ProcessingInstruction(_) => return Vec::new(),
        };
        for child in source.children() {
            for child_id in self.import(&child) {
                self.attach_unobserved(id, child_id);
            }
        }
        vec![id]
    }

    /// Serialises the whole document, doctype included.
    pub fn to_html(&self) -> String {
        let mut output = String::from("<!DOCTYPE html>");
        for child in self.children(self.root) {
            self.serialize_node(*child, false, &mut output);
        }
        output
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_node(id, false, &mut output);
        output
    }

    fn serialize_node(&self, id: NodeId, raw_text: bool, output: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Document) => {
                for child in self.children(id) {
                    self.serialize_node(*child, false, output);
                }
            }
            Some(NodeKind::Element(data)) => {
                output.push('<');
                output.push_str(data.tag());
                for (name, value) in data.attributes() {
                    output.push(' ');
                    output.push_str(name);
                    output.push_str("=\"");
                    output.push_str(&encode_double_quoted_attribute(value));
                    output.push('"');
                }
                output.push('>');
                if VOID_ELEMENTS.contains(&data.tag()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&data.tag());
                for child in self.children(id) {
                    self.serialize_node(*child, raw, output);
                }
                output.push_str("</");
                output.push_str(data.tag());
                output.push('>');
            }
            Some(NodeKind::Text(text)) if raw_text => output.push_str(text),
            Some(NodeKind::Text(text)) => output.push_str(&encode_text(text)),
            Some(NodeKind::Comment(text)) => {
                output.push_str("<!--");
                output.push_str(text);
                output.push_str("-->");
            }
            None => {}
        }
    }
}
