//! In-memory host document.
//!
//! The engine never owns the page it adjusts. Everything it knows about the
//! host goes through this arena: node handles are plain indices, detached
//! nodes stay allocated (so stale handles fail softly instead of aliasing),
//! and every child-list change is queued for the observers registered on an
//! ancestor of the change.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

mod cascade;
mod html;
mod observer;
mod style;

pub use cascade::{Selector, StyleRule, StyleSheet};
pub use observer::{MutationRecord, ObserverId};
pub use style::{format_px, parse_px, Declaration, InlineStyle};

use observer::ObserverRegistry;

/// Tags whose playback the document models as media.
const MEDIA_TAGS: &[&str] = &["video", "audio"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("missing node {0}")]
    MissingNode(NodeId),
    #[error("node {0} is not an element")]
    NotElement(NodeId),
    #[error("node {0} is not connected to the document")]
    Detached(NodeId),
    #[error("node {0} cannot have children")]
    NotContainer(NodeId),
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("node {0} has no playback state")]
    NoPlayback(NodeId),
    #[error("computed {property} of {node} is not a finite length")]
    NonFinite { node: NodeId, property: String },
    #[error("document has no {0}")]
    Missing(&'static str),
}

/// Runtime state the page keeps outside of attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Media { paused: bool },
    Marquee { running: bool },
}

#[derive(Debug, Clone)]
pub struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    playback: Option<Playback>,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let playback = if MEDIA_TAGS.contains(&tag.as_str()) {
            Some(Playback::Media { paused: true })
        } else if tag == "marquee" {
            Some(Playback::Marquee { running: true })
        } else {
            None
        };
        Self {
            tag,
            attrs: Vec::new(),
            playback,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn set_attribute(&mut self, name: String, value: String) {
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| key != name);
        before != self.attrs.len()
    }

    fn classes(&self) -> Vec<String> {
        self.attribute("class")
            .map(|raw| raw.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Viewport metrics of the window the host document is shown in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    observers: ObserverRegistry,
    viewport: Viewport,
    sheet_cache: RefCell<Option<Rc<StyleSheet>>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        let mut document = Self::bare();
        let html = document.create_element("html");
        let head = document.create_element("head");
        let body = document.create_element("body");
        document.attach_unobserved(document.root, html);
        document.attach_unobserved(html, head);
        document.attach_unobserved(html, body);
        document
    }

    fn bare() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
            observers: ObserverRegistry::default(),
            viewport: Viewport::default(),
            sheet_cache: RefCell::new(None),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::MissingNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::MissingNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            _ => Err(DomError::NotElement(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Nearest ancestor that is an element (the DOM's `parentElement`).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    /// Inclusive containment, like `Node.contains`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Pre-order walk of `root` and everything below it.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut collected = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if self.nodes.get(current.0).is_none() {
                continue;
            }
            collected.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        collected
    }

    /// Element descendants of `root` (inclusive) for which `filter` returns
    /// true. Returning `false` from `enter` prunes the whole branch.
    pub fn walk_elements(
        &self,
        root: NodeId,
        mut enter: impl FnMut(NodeId) -> bool,
        mut visit: impl FnMut(NodeId),
    ) {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if !self.is_element(current) {
                continue;
            }
            if !enter(current) {
                continue;
            }
            visit(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    fn child_of_root_by_tag(&self, tag: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|child| self.tag_name(*child) == Some(tag))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_of_root_by_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_of_root_by_tag("body")
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.subtree(self.root)
            .into_iter()
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.subtree(root)
            .into_iter()
            .filter(|node| self.tag_name(*node) == Some(tag))
            .collect()
    }

    /// Nearest inclusive ancestor carrying `name`.
    pub fn closest_with_attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.has_attribute(current, name) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    // ----- construction and tree edits ------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Comment(text.to_string()))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    fn can_have_children(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            Some(NodeKind::Document) | Some(NodeKind::Element(_))
        )
    }

    /// Used while building trees no observer can see yet.
    fn attach_unobserved(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.node(child)?;
        if !self.can_have_children(parent) {
            return Err(DomError::NotContainer(parent));
        }
        if child == self.root || self.contains(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }

        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child);
        }

        let position = reference
            .and_then(|reference| {
                self.children(parent)
                    .iter()
                    .position(|existing| *existing == reference)
            })
            .unwrap_or(self.children(parent).len());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(position, child);
        self.invalidate_styles();
        self.queue_child_list(parent, vec![child], Vec::new());
        Ok(())
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<(), DomError> {
        if node == self.root {
            return Err(DomError::Cycle {
                parent: self.root,
                child: node,
            });
        }
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        self.detach(parent, node);
        Ok(())
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        self.invalidate_styles();
        self.queue_child_list(parent, Vec::new(), vec![child]);
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        for node in self.subtree(id) {
            if let Some(NodeKind::Text(text)) = self.kind(node) {
                output.push_str(text);
            }
        }
        output
    }

    /// Replaces all children with a single text node (or none for "").
    pub fn set_text_content(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        if let NodeKind::Text(text) = &mut self.node_mut(id)?.kind {
            *text = value.to_string();
            self.invalidate_styles();
            return Ok(());
        }
        if !self.can_have_children(id) {
            return Err(DomError::NotContainer(id));
        }
        let removed = std::mem::take(&mut self.nodes[id.0].children);
        for child in &removed {
            self.nodes[child.0].parent = None;
        }
        let mut added = Vec::new();
        if !value.is_empty() {
            let text = self.create_text(value);
            self.attach_unobserved(id, text);
            added.push(text);
        }
        self.invalidate_styles();
        if !added.is_empty() || !removed.is_empty() {
            self.queue_child_list(id, added, removed);
        }
        Ok(())
    }

    /// True when one of the direct children is a text node with visible
    /// characters.
    pub fn has_direct_text(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|child| {
            matches!(self.kind(*child), Some(NodeKind::Text(text)) if !text.trim().is_empty())
        })
    }

    // ----- attributes -----------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|element| element.attribute(&name.to_ascii_lowercase()))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        self.element_mut(id)?
            .set_attribute(name, value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(id)?
            .remove_attribute(&name.to_ascii_lowercase());
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|element| element.classes().iter().any(|name| name == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.toggle_class(id, class, true)
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.toggle_class(id, class, false)
    }

    /// `classList.toggle(class, force)`.
    pub fn toggle_class(&mut self, id: NodeId, class: &str, present: bool) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        let mut classes = element.classes();
        let had = classes.iter().any(|name| name == class);
        if had == present {
            return Ok(());
        }
        if present {
            classes.push(class.to_string());
        } else {
            classes.retain(|name| name != class);
        }
        if classes.is_empty() {
            element.remove_attribute("class");
        } else {
            element.set_attribute("class".to_string(), classes.join(" "));
        }
        Ok(())
    }

    pub fn dataset(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attribute(id, &dataset_attribute_name(key))
    }

    pub fn set_dataset(&mut self, id: NodeId, key: &str, value: &str) -> Result<(), DomError> {
        self.set_attribute(id, &dataset_attribute_name(key), value)
    }

    pub fn remove_dataset(&mut self, id: NodeId, key: &str) -> Result<(), DomError> {
        self.remove_attribute(id, &dataset_attribute_name(key))
    }

    /// Every `data-*` attribute as `(camelCaseKey, value)`, in source order.
    pub fn dataset_entries(&self, id: NodeId) -> Vec<(String, String)> {
        let Some(element) = self.element(id) else {
            return Vec::new();
        };
        element
            .attributes()
            .filter_map(|(name, value)| {
                let rest = name.strip_prefix("data-")?;
                Some((dataset_key(rest), value.to_string()))
            })
            .collect()
    }

    // ----- inline style ---------------------------------------------------

    pub fn inline_style(&self, id: NodeId) -> InlineStyle {
        InlineStyle::parse(self.attribute(id, "style").unwrap_or(""))
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        self.inline_style(id)
            .get(property)
            .map(|declaration| declaration.value.clone())
    }

    pub fn style_is_important(&self, id: NodeId, property: &str) -> bool {
        self.inline_style(id)
            .get(property)
            .map(|declaration| declaration.important)
            .unwrap_or(false)
    }

    /// `style.setProperty`; an empty value removes the declaration.
    pub fn set_style_property(
        &mut self,
        id: NodeId,
        property: &str,
        value: &str,
        important: bool,
    ) -> Result<(), DomError> {
        let mut style = self.inline_style(id);
        if value.trim().is_empty() {
            style.remove(property);
        } else {
            style.set(property, value, important);
        }
        self.write_inline_style(id, &style)
    }

    pub fn remove_style_property(&mut self, id: NodeId, property: &str) -> Result<(), DomError> {
        let mut style = self.inline_style(id);
        if style.remove(property).is_none() {
            return Ok(());
        }
        self.write_inline_style(id, &style)
    }

    fn write_inline_style(&mut self, id: NodeId, style: &InlineStyle) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        if style.is_empty() {
            element.remove_attribute("style");
        } else {
            element.set_attribute("style".to_string(), style.to_css_text());
        }
        Ok(())
    }

    // ----- playback -------------------------------------------------------

    pub fn playback(&self, id: NodeId) -> Option<Playback> {
        self.element(id).and_then(|element| element.playback)
    }

    fn playback_mut(&mut self, id: NodeId) -> Result<&mut Playback, DomError> {
        self.element_mut(id)?
            .playback
            .as_mut()
            .ok_or(DomError::NoPlayback(id))
    }

    pub fn is_media(&self, id: NodeId) -> bool {
        matches!(self.playback(id), Some(Playback::Media { .. }))
    }

    pub fn is_paused(&self, id: NodeId) -> Result<bool, DomError> {
        match self.playback(id) {
            Some(Playback::Media { paused }) => Ok(paused),
            _ => Err(DomError::NoPlayback(id)),
        }
    }

    pub fn play(&mut self, id: NodeId) -> Result<(), DomError> {
        self.set_media_paused(id, false)
    }

    pub fn pause(&mut self, id: NodeId) -> Result<(), DomError> {
        self.set_media_paused(id, true)
    }

    fn set_media_paused(&mut self, id: NodeId, value: bool) -> Result<(), DomError> {
        match self.playback_mut(id)? {
            Playback::Media { paused } => {
                *paused = value;
                Ok(())
            }
            Playback::Marquee { .. } => Err(DomError::NoPlayback(id)),
        }
    }

    pub fn is_marquee_running(&self, id: NodeId) -> Result<bool, DomError> {
        match self.playback(id) {
            Some(Playback::Marquee { running }) => Ok(running),
            _ => Err(DomError::NoPlayback(id)),
        }
    }

    pub fn set_marquee_running(&mut self, id: NodeId, value: bool) -> Result<(), DomError> {
        match self.playback_mut(id)? {
            Playback::Marquee { running } => {
                *running = value;
                Ok(())
            }
            Playback::Media { .. } => Err(DomError::NoPlayback(id)),
        }
    }

    // ----- computed style -------------------------------------------------

    fn invalidate_styles(&self) {
        self.sheet_cache.borrow_mut().take();
    }

    /// Author rules from every connected `<style>` element, in document order.
    pub fn stylesheet(&self) -> Rc<StyleSheet> {
        if let Some(sheet) = self.sheet_cache.borrow().as_ref() {
            return Rc::clone(sheet);
        }
        let mut sheet = StyleSheet::default();
        for node in self.elements_by_tag(self.root, "style") {
            sheet.extend_from_css(&self.text_content(node));
        }
        let sheet = Rc::new(sheet);
        *self.sheet_cache.borrow_mut() = Some(Rc::clone(&sheet));
        sheet
    }

    fn ensure_styled(&self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        if !self.is_element(id) {
            return Err(DomError::NotElement(id));
        }
        if !self.is_connected(id) {
            return Err(DomError::Detached(id));
        }
        Ok(())
    }

    /// `getComputedStyle(element).getPropertyValue(property)` for the
    /// properties the engine reads.
    pub fn computed_style(&self, id: NodeId, property: &str) -> Result<String, DomError> {
        self.ensure_styled(id)?;
        let sheet = self.stylesheet();
        match property {
            "font-size" => Ok(format_px(self.font_size_px(&sheet, id)?)),
            "background-image" => Ok(self.background_image(&sheet, id)),
            _ => Ok(self.resolved_value(&sheet, id, property)),
        }
    }

    /// Computed font size in CSS pixels.
    pub fn computed_font_size(&self, id: NodeId) -> Result<f64, DomError> {
        self.ensure_styled(id)?;
        let sheet = self.stylesheet();
        self.font_size_px(&sheet, id)
    }

    fn resolved_value(&self, sheet: &StyleSheet, id: NodeId, property: &str) -> String {
        match sheet.cascaded_value(self, id, property) {
            Some(value) if value.eq_ignore_ascii_case("inherit") => {
                self.inherited_value(sheet, id, property)
            }
            Some(value) => value,
            None if cascade::is_inherited(property) => self.inherited_value(sheet, id, property),
            None => cascade::initial_value(property).to_string(),
        }
    }

    fn inherited_value(&self, sheet: &StyleSheet, id: NodeId, property: &str) -> String {
        match self.parent_element(id) {
            Some(parent) => self.resolved_value(sheet, parent, property),
            None => cascade::initial_value(property).to_string(),
        }
    }

    fn font_size_px(&self, sheet: &StyleSheet, id: NodeId) -> Result<f64, DomError> {
        let parent_px = match self.parent_element(id) {
            Some(parent) => self.font_size_px(sheet, parent)?,
            None => cascade::DEFAULT_FONT_SIZE_PX,
        };
        let root_px = match self.document_element() {
            Some(html) if html != id && self.is_connected(id) => self.font_size_px(sheet, html)?,
            _ => cascade::DEFAULT_FONT_SIZE_PX,
        };
        let size = sheet
            .cascaded_value(self, id, "font-size")
            .and_then(|value| cascade::resolve_font_size(&value, parent_px, root_px))
            .unwrap_or(parent_px);
        if !size.is_finite() {
            return Err(DomError::NonFinite {
                node: id,
                property: "font-size".to_string(),
            });
        }
        Ok(size)
    }

    fn background_image(&self, sheet: &StyleSheet, id: NodeId) -> String {
        if let Some(value) = sheet.cascaded_value(self, id, "background-image") {
            return value;
        }
        sheet
            .cascaded_value(self, id, "background")
            .and_then(|shorthand| cascade::image_from_background_shorthand(&shorthand))
            .unwrap_or_else(|| "none".to_string())
    }

    // ----- observation ----------------------------------------------------

    /// Watch child-list changes anywhere under `target`.
    pub fn observe(&mut self, target: NodeId) -> ObserverId {
        self.observers.register(target)
    }

    pub fn disconnect(&mut self, observer: ObserverId) {
        self.observers.remove(observer);
    }

    pub fn is_observing(&self, observer: ObserverId) -> bool {
        self.observers.contains(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Drain the records queued for `observer` since the last call.
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take(observer)
    }

    fn queue_child_list(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        let interested: Vec<ObserverId> = self
            .observers
            .targets()
            .filter(|(_, watched)| self.contains(*watched, target))
            .map(|(observer, _)| observer)
            .collect();
        if interested.is_empty() {
            return;
        }
        let record = MutationRecord {
            target,
            added_nodes: added,
            removed_nodes: removed,
        };
        for observer in interested {
            self.observers.push(observer, record.clone());
        }
    }
}

/// `dataset.fooBar` → `data-foo-bar`.
fn dataset_attribute_name(key: &str) -> String {
    let mut name = String::from("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

/// `foo-bar` (after `data-`) → `fooBar`.
fn dataset_key(rest: &str) -> String {
    let mut key = String::with_capacity(rest.len());
    let mut upper = false;
    for ch in rest.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            key.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            key.push(ch);
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let div = doc.create_element("div");
        doc.append_child(body, div).unwrap();
        let text = doc.create_text("hello");
        doc.append_child(div, text).unwrap();
        (doc, body, div)
    }

    #[test]
    fn builds_skeleton() {
        let doc = Document::new();
        let html = doc.document_element().unwrap();
        assert_eq!(doc.tag_name(html), Some("html"));
        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
    }

    #[test]
    fn dataset_keys_map_to_kebab_attributes() {
        assert_eq!(
            dataset_attribute_name("a11yStiacTextAlignValue"),
            "data-a11y-stiac-text-align-value"
        );
        assert_eq!(dataset_key("a11y-stiac-text-align-value"), "a11yStiacTextAlignValue");
    }

    #[test]
    fn class_toggle_keeps_other_classes() {
        let (mut doc, _, div) = sample();
        doc.set_attribute(div, "class", "card wide").unwrap();
        doc.add_class(div, "active").unwrap();
        doc.remove_class(div, "card").unwrap();
        assert_eq!(doc.attribute(div, "class"), Some("wide active"));
        doc.remove_class(div, "wide").unwrap();
        doc.remove_class(div, "active").unwrap();
        assert!(!doc.has_attribute(div, "class"));
    }

    #[test]
    fn style_property_round_trips_priority() {
        let (mut doc, _, div) = sample();
        doc.set_attribute(div, "style", "color: red; background-image: url(a.png) !important;")
            .unwrap();
        assert_eq!(doc.style_property(div, "background-image").as_deref(), Some("url(a.png)"));
        assert!(doc.style_is_important(div, "background-image"));
        doc.set_style_property(div, "background-image", "none", false).unwrap();
        assert!(!doc.style_is_important(div, "background-image"));
        doc.remove_style_property(div, "background-image").unwrap();
        doc.remove_style_property(div, "color").unwrap();
        assert!(!doc.has_attribute(div, "style"));
    }

    #[test]
    fn insert_rejects_cycles() {
        let (mut doc, body, div) = sample();
        assert!(matches!(
            doc.append_child(div, body),
            Err(DomError::Cycle { .. })
        ));
    }

    #[test]
    fn observers_receive_subtree_changes_only() {
        let (mut doc, body, div) = sample();
        let head = doc.head().unwrap();
        let watcher = doc.observe(body);
        let span = doc.create_element("span");
        doc.append_child(div, span).unwrap();
        let meta = doc.create_element("meta");
        doc.append_child(head, meta).unwrap();
        doc.remove_node(span).unwrap();

        let records = doc.take_records(watcher);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].added_nodes, vec![span]);
        assert_eq!(records[1].removed_nodes, vec![span]);
        assert!(doc.take_records(watcher).is_empty());

        doc.disconnect(watcher);
        assert!(!doc.is_observing(watcher));
    }

    #[test]
    fn detached_nodes_have_no_computed_style() {
        let (mut doc, _, div) = sample();
        doc.remove_node(div).unwrap();
        assert_eq!(
            doc.computed_style(div, "font-size"),
            Err(DomError::Detached(div))
        );
    }

    #[test]
    fn media_starts_paused() {
        let mut doc = Document::new();
        let video = doc.create_element("VIDEO");
        assert_eq!(doc.tag_name(video), Some("video"));
        assert_eq!(doc.is_paused(video), Ok(true));
        doc.play(video).unwrap();
        assert_eq!(doc.is_paused(video), Ok(false));
        let div = doc.create_element("div");
        assert_eq!(doc.is_paused(div), Err(DomError::NoPlayback(div)));
    }
}
