//! Keeps tracked effects current while the host page mutates itself.
//!
//! Each tracked effect owns at most one document observer. Delivered records
//! only ever touch the added or removed subtrees; the full-document scan
//! happens once, when the effect is switched on.

use crate::dom::{Document, NodeId, NodeKind, ObserverId};
use crate::engine::{Engine, TrackedEffect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverState {
    #[default]
    Inactive,
    Observing(ObserverId),
}

#[derive(Debug, Clone, Copy)]
pub struct EffectObserver {
    effect: TrackedEffect,
    state: ObserverState,
}

impl EffectObserver {
    fn new(effect: TrackedEffect) -> Self {
        Self {
            effect,
            state: ObserverState::Inactive,
        }
    }

    pub fn effect(&self) -> TrackedEffect {
        self.effect
    }

    pub fn state(&self) -> ObserverState {
        self.state
    }

    fn activate(&mut self, doc: &mut Document) {
        if let ObserverState::Observing(_) = self.state {
            return;
        }
        let Some(target) = Engine::scan_root(doc) else {
            return;
        };
        let id = doc.observe(target);
        tracing::debug!(target: "a11y::observe", effect = self.effect.name(), "observing host mutations");
        self.state = ObserverState::Observing(id);
    }

    fn deactivate(&mut self, doc: &mut Document) {
        if let ObserverState::Observing(id) = self.state {
            doc.disconnect(id);
            tracing::debug!(target: "a11y::observe", effect = self.effect.name(), "observer disconnected");
        }
        self.state = ObserverState::Inactive;
    }
}

/// Summary of one delivery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub records: usize,
    pub applied_subtrees: usize,
    pub released_subtrees: usize,
}

#[derive(Debug)]
pub struct ObservationLayer {
    observers: [EffectObserver; 3],
}

impl Default for ObservationLayer {
    fn default() -> Self {
        Self {
            observers: TrackedEffect::ALL.map(EffectObserver::new),
        }
    }
}

impl ObservationLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, effect: TrackedEffect) -> ObserverState {
        self.observer(effect).map(EffectObserver::state).unwrap_or_default()
    }

    fn observer(&self, effect: TrackedEffect) -> Option<&EffectObserver> {
        self.observers.iter().find(|observer| observer.effect == effect)
    }

    /// Starts or stops each observer to match what the engine has active.
    /// Running it again without engine changes does nothing.
    pub fn sync(&mut self, doc: &mut Document, engine: &Engine) {
        for observer in &mut self.observers {
            if engine.is_active(observer.effect) {
                observer.activate(doc);
            } else {
                observer.deactivate(doc);
            }
        }
    }

    /// Drops every observer, e.g. when the widget is torn down.
    pub fn disconnect_all(&mut self, doc: &mut Document) {
        for observer in &mut self.observers {
            observer.deactivate(doc);
        }
    }

    /// The microtask checkpoint: hands queued child-list records to the
    /// engine, in order, per effect.
    pub fn deliver(&mut self, doc: &mut Document, engine: &mut Engine) -> DeliveryStats {
        let mut stats = DeliveryStats::default();
        for observer in &self.observers {
            let ObserverState::Observing(id) = observer.state else {
                continue;
            };
            let records = doc.take_records(id);
            stats.records += records.len();
            for record in records {
                for removed in record.removed_nodes {
                    engine.release_subtree(doc, observer.effect, removed);
                    stats.released_subtrees += 1;
                }
                for added in record.added_nodes {
                    if let Some(scope) = application_scope(doc, observer.effect, added) {
                        engine.apply_to_subtree(doc, observer.effect, scope);
                        stats.applied_subtrees += 1;
                    }
                }
            }
        }
        if stats.records > 0 {
            tracing::trace!(
                target: "a11y::observe",
                records = stats.records,
                applied = stats.applied_subtrees,
                released = stats.released_subtrees,
                "delivered mutation records"
            );
        }
        stats
    }
}

/// Where an added node should be processed from. Nodes that left the
/// document again before delivery are skipped; a new text node makes its
/// parent a font-scale candidate.
fn application_scope(doc: &Document, effect: TrackedEffect, added: NodeId) -> Option<NodeId> {
    if !doc.is_connected(added) {
        return None;
    }
    match doc.kind(added)? {
        NodeKind::Element(_) => Some(added),
        NodeKind::Text(_) if effect == TrackedEffect::FontScale => doc.parent_element(added),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FontScale;

    #[test]
    fn sync_is_idempotent() {
        let mut doc = Document::new();
        let mut engine = Engine::new();
        let mut layer = ObservationLayer::new();
        engine.set_hide_images(&mut doc, true);
        layer.sync(&mut doc, &engine);
        layer.sync(&mut doc, &engine);
        assert_eq!(doc.observer_count(), 1);
        assert!(matches!(
            layer.state(TrackedEffect::HideImages),
            ObserverState::Observing(_)
        ));

        engine.set_hide_images(&mut doc, false);
        layer.sync(&mut doc, &engine);
        assert_eq!(doc.observer_count(), 0);
        assert_eq!(layer.state(TrackedEffect::HideImages), ObserverState::Inactive);
    }

    #[test]
    fn inserted_text_registers_parent() {
        let mut doc = Document::parse_html("<p id=a>one</p><div id=late></div>");
        let mut engine = Engine::new();
        let mut layer = ObservationLayer::new();
        engine.set_font_scale(&mut doc, FontScale::LARGER);
        layer.sync(&mut doc, &engine);

        let late = doc.element_by_id("late").unwrap();
        let text = doc.create_text("arrived later");
        doc.append_child(late, text).unwrap();
        let stats = layer.deliver(&mut doc, &mut engine);
        assert_eq!(stats.records, 1);
        assert_eq!(doc.style_property(late, "font-size").as_deref(), Some("24px"));
    }

    #[test]
    fn nodes_removed_before_delivery_are_skipped() {
        let mut doc = Document::new();
        let mut engine = Engine::new();
        let mut layer = ObservationLayer::new();
        engine.set_hide_images(&mut doc, true);
        layer.sync(&mut doc, &engine);

        let body = doc.body().unwrap();
        let div = doc.create_element("div");
        doc.set_attribute(div, "style", "background-image: url(x.png)").unwrap();
        doc.append_child(body, div).unwrap();
        doc.remove_node(div).unwrap();
        let stats = layer.deliver(&mut doc, &mut engine);
        assert_eq!(stats.applied_subtrees, 0);
        assert_eq!(doc.style_property(div, "background-image").as_deref(), Some("url(x.png)"));
    }
}
