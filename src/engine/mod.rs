//! Mutations the widget applies to the host document.
//!
//! Each effect is idempotent: applying an active effect again, or reverting
//! an inactive one, leaves the document untouched. Per-element bookkeeping
//! for exact reversion lives in the maps owned by [`Engine`], never in
//! attributes the host could see or clobber.

mod cursor;
mod filters;
mod fonts;
mod images;
mod motion;
mod root_style;
mod text;

pub use cursor::{guide_beam_left, PointerPosition};
pub use filters::filter_value;
pub use root_style::InlineSnapshot;

use crate::dom::{DomError, Document, NodeId};
use crate::state::PreferenceState;

use cursor::CursorOverlay;
use fonts::FontRegistry;
use images::BackgroundSuppression;
use motion::MotionRegistry;
use root_style::RootStyleGuard;

/// Class and attribute names shared by the engine, the chrome and the
/// global stylesheet.
pub mod markers {
    pub const WIDGET_ROOT_ID: &str = "accessibility-modal";
    pub const CURSOR_ID: &str = "cursor";
    pub const TRIANGLE_CURSOR_ID: &str = "triangle-cursor";

    /// Set on every element the widget itself inserts into the host page.
    pub const WIDGET_OWNED: &str = "data-a11y-stiac-widget";
    pub const PRESERVE_IMAGES: &str = "data-a11y-stiac-preserve-images";
    pub const PRESERVE_MOTION: &str = "data-a11y-stiac-preserve-motion";

    pub const HIDE_IMAGES_CLASS: &str = "a11y-stiac-hide-images";
    pub const HIDE_VIDEO_CLASS: &str = "a11y-stiac-hide-video";
    pub const REDUCE_MOTION_CLASS: &str = "a11y-stiac-reduce-motion";
    pub const LINE_HEIGHT_CLASSES: [&str; 3] = [
        "a11y-stiac-line-height-0",
        "a11y-stiac-line-height-1",
        "a11y-stiac-line-height-2",
    ];
    pub const UNDERLINE_CLASSES: [&str; 3] = [
        "a11y-stiac-underline-style-0",
        "a11y-stiac-underline-style-1",
        "a11y-stiac-underline-style-2",
    ];

    pub const TEXT_ALIGN_ATTR: &str = "data-a11y-stiac-text-align";
    pub const TEXT_ALIGN_DATASET: &str = "a11yStiacTextAlignValue";
    pub const DYSLEXIA_ATTR: &str = "data-a11y-stiac-dyslexia-font";
    pub const REDUCE_MOTION_ATTR: &str = "data-a11y-stiac-reduce-motion";
    pub const FONT_SCALE_ATTR: &str = "data-a11y-stiac-font-scale";
}

/// Effects whose per-element tracking follows host DOM churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedEffect {
    HideImages,
    FontScale,
    ReduceMotion,
}

impl TrackedEffect {
    pub const ALL: [TrackedEffect; 3] = [Self::HideImages, Self::FontScale, Self::ReduceMotion];

    pub fn name(self) -> &'static str {
        match self {
            Self::HideImages => "hide-images",
            Self::FontScale => "font-scale",
            Self::ReduceMotion => "reduce-motion",
        }
    }
}

#[derive(Debug, Default)]
pub struct Engine {
    root_styles: RootStyleGuard,
    images: BackgroundSuppression,
    fonts: FontRegistry,
    motion: MotionRegistry,
    cursor: CursorOverlay,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings every effect in line with `state`.
    pub fn apply_all(&mut self, doc: &mut Document, state: &PreferenceState) {
        self.apply_color_filters(doc, &state.color_filters);
        self.set_hide_images(doc, state.hide_images);
        self.set_hide_video(doc, state.hide_video);
        self.set_font_scale(doc, state.font_scale);
        self.set_line_height(doc, state.line_height);
        self.set_letter_spacing(doc, state.letter_spacing);
        self.set_link_style(doc, state.link_style);
        self.set_text_align(doc, state.text_align);
        self.set_dyslexia_font(doc, state.dyslexia_font);
        self.set_reduce_motion(doc, state.reduce_motion.effective());
        self.set_cursor_style(doc, state.cursor_style);
    }

    pub fn is_active(&self, effect: TrackedEffect) -> bool {
        match effect {
            TrackedEffect::HideImages => self.images.is_active(),
            TrackedEffect::FontScale => self.fonts.is_active(),
            TrackedEffect::ReduceMotion => self.motion.is_active(),
        }
    }

    /// Number of elements currently holding a reversion record for `effect`.
    pub fn tracked_count(&self, effect: TrackedEffect) -> usize {
        match effect {
            TrackedEffect::HideImages => self.images.tracked_count(),
            TrackedEffect::FontScale => self.fonts.tracked_count(),
            TrackedEffect::ReduceMotion => self.motion.tracked_count(),
        }
    }

    pub fn is_tracked(&self, effect: TrackedEffect, node: NodeId) -> bool {
        match effect {
            TrackedEffect::HideImages => self.images.is_tracked(node),
            TrackedEffect::FontScale => self.fonts.is_tracked(node),
            TrackedEffect::ReduceMotion => self.motion.is_tracked(node),
        }
    }

    /// Runs the effect's apply routine on a freshly inserted subtree.
    pub fn apply_to_subtree(&mut self, doc: &mut Document, effect: TrackedEffect, scope: NodeId) {
        if !self.is_active(effect) {
            return;
        }
        match effect {
            TrackedEffect::HideImages => self.images.suppress(doc, scope),
            TrackedEffect::FontScale => self.fonts.register_and_apply(doc, scope),
            TrackedEffect::ReduceMotion => self.motion.pause(doc, scope),
        }
    }

    /// Reverts and forgets every record for nodes inside a removed subtree.
    pub fn release_subtree(&mut self, doc: &mut Document, effect: TrackedEffect, scope: NodeId) {
        match effect {
            TrackedEffect::HideImages => self.images.release(doc, scope),
            TrackedEffect::FontScale => self.fonts.release(doc, scope),
            TrackedEffect::ReduceMotion => self.motion.release(doc, scope),
        }
    }

    /// The subtree full scans start from: `<body>`, else `<html>`.
    pub fn scan_root(doc: &Document) -> Option<NodeId> {
        doc.body().or_else(|| doc.document_element())
    }
}

/// True for nodes the widget inserted itself, or that sit under a host
/// opt-out marker such as [`markers::PRESERVE_IMAGES`].
pub(crate) fn excluded(doc: &Document, node: NodeId, preserve: Option<&str>) -> bool {
    if doc.closest_with_attribute(node, markers::WIDGET_OWNED).is_some() {
        return true;
    }
    preserve
        .map(|marker| doc.closest_with_attribute(node, marker).is_some())
        .unwrap_or(false)
}

/// `<html>` and `<body>` carry the widget's global markers and are never
/// per-element targets.
pub(crate) fn is_document_shell(doc: &Document, node: NodeId) -> bool {
    Some(node) == doc.document_element() || Some(node) == doc.body()
}

pub(crate) fn log_skip(effect: &str, node: NodeId, err: &DomError) {
    tracing::debug!(target: "a11y::engine", effect, %node, error = %err, "skipping element");
}
