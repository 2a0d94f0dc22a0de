use std::collections::HashMap;

use crate::dom::{Document, DomError, NodeId};

use super::{excluded, log_skip, markers, Engine};

#[derive(Debug, Clone, PartialEq, Eq)]
enum MotionRecord {
    Media {
        /// Original attribute values, `None` when absent.
        looped: Option<String>,
        autoplay: Option<String>,
        paused_by_engine: bool,
    },
    Marquee {
        scroll_amount: Option<String>,
        behavior: Option<String>,
    },
}

#[derive(Debug, Default)]
pub(crate) struct MotionRegistry {
    active: bool,
    records: HashMap<NodeId, MotionRecord>,
}

impl MotionRegistry {
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn tracked_count(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_tracked(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    /// Stops every video, audio and marquee under `scope`.
    pub(crate) fn pause(&mut self, doc: &mut Document, scope: NodeId) {
        if excluded(doc, scope, Some(markers::PRESERVE_MOTION)) {
            return;
        }
        let mut targets = Vec::new();
        doc.walk_elements(
            scope,
            |node| {
                !doc.has_attribute(node, markers::WIDGET_OWNED)
                    && !doc.has_attribute(node, markers::PRESERVE_MOTION)
            },
            |node| {
                if doc.playback(node).is_some() {
                    targets.push(node);
                }
            },
        );

        for node in targets {
            if self.records.contains_key(&node) {
                continue;
            }
            let record = if doc.is_media(node) {
                Self::pause_media(doc, node)
            } else {
                Self::stop_marquee(doc, node)
            };
            match record {
                Ok(record) => {
                    self.records.insert(node, record);
                }
                Err(err) => log_skip("reduce-motion", node, &err),
            }
        }
    }

    fn pause_media(doc: &mut Document, node: NodeId) -> Result<MotionRecord, DomError> {
        let was_playing = !doc.is_paused(node)?;
        let looped = doc.attribute(node, "loop").map(str::to_string);
        let autoplay = doc.attribute(node, "autoplay").map(str::to_string);
        if was_playing {
            doc.pause(node)?;
        }
        doc.remove_attribute(node, "loop")?;
        doc.remove_attribute(node, "autoplay")?;
        Ok(MotionRecord::Media {
            looped,
            autoplay,
            paused_by_engine: was_playing,
        })
    }

    fn stop_marquee(doc: &mut Document, node: NodeId) -> Result<MotionRecord, DomError> {
        let scroll_amount = doc.attribute(node, "scrollamount").map(str::to_string);
        let behavior = doc.attribute(node, "behavior").map(str::to_string);
        doc.set_attribute(node, "scrollamount", "0")?;
        doc.set_marquee_running(node, false)?;
        Ok(MotionRecord::Marquee {
            scroll_amount,
            behavior,
        })
    }

    fn restore_attribute(
        doc: &mut Document,
        node: NodeId,
        name: &str,
        value: &Option<String>,
    ) -> Result<(), DomError> {
        match value {
            Some(value) => doc.set_attribute(node, name, value),
            None => doc.remove_attribute(node, name),
        }
    }

    /// Undoes one record. Detached nodes get their attributes back but are not
    /// resumed.
    fn resume(doc: &mut Document, node: NodeId, record: MotionRecord) -> Result<(), DomError> {
        let connected = doc.is_connected(node);
        match record {
            MotionRecord::Media {
                looped,
                autoplay,
                paused_by_engine,
            } => {
                if let Some(value) = looped {
                    doc.set_attribute(node, "loop", &value)?;
                }
                if let Some(value) = autoplay {
                    doc.set_attribute(node, "autoplay", &value)?;
                }
                if paused_by_engine && connected {
                    doc.play(node)?;
                }
            }
            MotionRecord::Marquee {
                scroll_amount,
                behavior,
            } => {
                Self::restore_attribute(doc, node, "scrollamount", &scroll_amount)?;
                Self::restore_attribute(doc, node, "behavior", &behavior)?;
                doc.set_marquee_running(node, true)?;
            }
        }
        Ok(())
    }

    fn resume_all(&mut self, doc: &mut Document) {
        for (node, record) in std::mem::take(&mut self.records) {
            if let Err(err) = Self::resume(doc, node, record) {
                log_skip("reduce-motion", node, &err);
            }
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
                if let Err(err) = Self::resume(doc, node, record) {
                    log_skip("reduce-motion", node, &err);
                }
            }
        }
    }
}

impl Engine {
    /// Pauses host media and marks the root so the global stylesheet kills
    /// animations and transitions. Turning it off resumes only the media the
    /// engine paused.
    pub fn set_reduce_motion(&mut self, doc: &mut Document, active: bool) {
        if let Some(root) = doc.document_element() {
            let result = doc
                .toggle_class(root, markers::REDUCE_MOTION_CLASS, active)
                .and_then(|()| {
                    if active {
                        doc.set_attribute(root, markers::REDUCE_MOTION_ATTR, "true")
                    } else {
                        doc.remove_attribute(root, markers::REDUCE_MOTION_ATTR)
                    }
                });
            if let Err(err) = result {
                log_skip("reduce-motion", root, &err);
            }
        }
        if active == self.motion.active {
            return;
        }
        self.motion.active = active;
        if active {
            if let Some(scope) = doc.document_element() {
                self.motion.pause(doc, scope);
            }
        } else {
            self.motion.resume_all(doc);
        }
    }
}
