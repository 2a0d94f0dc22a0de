//! Maps activations on the widget chrome to preference transitions and the
//! engine calls that apply them. Enter and Space behave exactly like a click.

use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::engine::{markers, Engine};
use crate::i18n::{format_template, I18n, MessageParams};
use crate::state::{
    Contrast, CursorStyle, Cycle, DockPosition, FontScale, LetterSpacing, LineHeight, LinkStyle,
    PreferenceState, PreferenceStore, Saturation, TextAlign,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    InvertColors,
    Grayscale,
    Saturation,
    Contrast,
    Underline,
    FontSize,
    LineHeight,
    LetterSpacing,
    TextAlign,
    FontDyslexia,
    HideImages,
    HideVideo,
    ReduceMotion,
    ChangeCursor,
    ResetAll,
    PanelToggle,
    Position(DockPosition),
}

impl Control {
    /// The tool grid, in display order.
    pub const TOOLS: [Control; 14] = [
        Self::InvertColors,
        Self::Grayscale,
        Self::Saturation,
        Self::Underline,
        Self::FontSize,
        Self::LineHeight,
        Self::LetterSpacing,
        Self::FontDyslexia,
        Self::TextAlign,
        Self::Contrast,
        Self::HideImages,
        Self::HideVideo,
        Self::ReduceMotion,
        Self::ChangeCursor,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::InvertColors => "invert-colors",
            Self::Grayscale => "grayscale",
            Self::Saturation => "saturation",
            Self::Contrast => "contrast",
            Self::Underline => "underline",
            Self::FontSize => "font-size",
            Self::LineHeight => "line-height",
            Self::LetterSpacing => "letter-spacing",
            Self::TextAlign => "text-align",
            Self::FontDyslexia => "font-dyslexia",
            Self::HideImages => "hide-images",
            Self::HideVideo => "hide-video",
            Self::ReduceMotion => "reduce-motion",
            Self::ChangeCursor => "change-cursor",
            Self::ResetAll => "reset-all",
            Self::PanelToggle => "closeBtn",
            Self::Position(position) => position.control_id(),
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        if let Some(position) = DockPosition::from_control_id(id) {
            return Some(Self::Position(position));
        }
        Self::TOOLS
            .into_iter()
            .chain([Self::ResetAll, Self::PanelToggle])
            .find(|control| control.id() == id)
    }

    /// Translation key and English text of the visible label.
    pub fn label(self) -> Option<(&'static str, &'static str)> {
        let label = match self {
            Self::InvertColors => ("controls.invertColours.label", "Invert Colours"),
            Self::Grayscale => ("controls.grayscale.label", "Grayscale"),
            Self::Saturation => ("controls.lowSaturation.label", "Low Saturation"),
            Self::Contrast => ("controls.contrast.label", "Contrast"),
            Self::Underline => ("controls.linksHighlight.label", "Links Highlight"),
            Self::FontSize => ("controls.fontSize.label", "Font Size"),
            Self::LineHeight => ("controls.lineHeight.label", "Line Height"),
            Self::LetterSpacing => ("controls.letterSpacing.label", "Letter Spacing"),
            Self::TextAlign => ("controls.textAlign.label", "Text Align"),
            Self::FontDyslexia => ("controls.fontDyslexia.label", "Font Dyslexia"),
            Self::HideImages => ("controls.hideImages.label", "Hide Image"),
            Self::HideVideo => ("controls.hideVideo.label", "Hide Video"),
            Self::ReduceMotion => ("controls.reduceMotion.label", "Reduce Motion"),
            Self::ChangeCursor => ("controls.changeCursors.label", "Change Cursors"),
            Self::ResetAll => ("controls.resetAll.label", "Reset All"),
            Self::PanelToggle | Self::Position(_) => return None,
        };
        Some(label)
    }

    pub fn description(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::FontDyslexia => Some((
                "controls.fontDyslexia.description",
                "Toggle a dyslexia-friendly font stack across the page without altering the accessibility menu.",
            )),
            Self::TextAlign => Some((
                "controls.textAlign.description",
                "Choose how text should align across the page. Click repeatedly to cycle through the available alignments; after the last option the alignment returns to the site default.",
            )),
            Self::ReduceMotion => Some((
                "controls.reduceMotion.description",
                "Stop animated, blinking, and flashing visuals from playing automatically across the page.",
            )),
            _ => None,
        }
    }

    /// One segment per non-default state of a cyclic control.
    pub fn progress_segments(self) -> usize {
        match self {
            Self::Saturation => Saturation::STOPS.len(),
            Self::Contrast => Contrast::STOPS.len(),
            Self::Underline => LinkStyle::STOPS.len(),
            Self::FontSize => FontScale::STOPS.len(),
            Self::LineHeight => LineHeight::STOPS.len(),
            Self::LetterSpacing => LetterSpacing::STOPS.len(),
            Self::TextAlign => TextAlign::STOPS.len(),
            Self::ChangeCursor => CursorStyle::STOPS.len(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Other,
}

impl Key {
    /// `KeyboardEvent.key` names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Self::Enter,
            " " | "Space" | "Spacebar" => Self::Space,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Pointer,
    Key(Key),
}

impl Activation {
    pub fn triggers(self) -> bool {
        !matches!(self, Self::Key(Key::Other))
    }
}

/// What a control activation changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub control: Control,
    /// The dyslexia font was just switched on and its stylesheet may be
    /// missing.
    pub needs_font_asset: bool,
}

/// The control `target` belongs to: the nearest element, itself included,
/// whose id names a control inside the widget.
pub fn resolve_control(doc: &Document, target: NodeId) -> Option<Control> {
    let widget = doc.element_by_id(markers::WIDGET_ROOT_ID)?;
    if !doc.contains(widget, target) {
        return None;
    }
    let mut cursor = Some(target);
    while let Some(node) = cursor {
        if node == widget {
            return None;
        }
        if let Some(control) = doc.attribute(node, "id").and_then(Control::from_id) {
            return Some(control);
        }
        cursor = doc.parent_element(node);
    }
    None
}

/// Runs the store transition for `control`. Position controls are inert
/// unless `positions_enabled`; the panel toggle has no preference side.
pub fn transition(
    store: &mut PreferenceStore,
    control: Control,
    positions_enabled: bool,
) -> Option<Transition> {
    let mut needs_font_asset = false;
    match control {
        Control::InvertColors => {
            store.toggle_invert();
        }
        Control::Grayscale => {
            store.toggle_grayscale();
        }
        Control::Saturation => {
            store.cycle_saturation();
        }
        Control::Contrast => {
            store.cycle_contrast();
        }
        Control::Underline => {
            store.cycle_link_style();
        }
        Control::FontSize => {
            store.cycle_font_scale();
        }
        Control::LineHeight => {
            store.cycle_line_height();
        }
        Control::LetterSpacing => {
            store.cycle_letter_spacing();
        }
        Control::TextAlign => {
            store.cycle_text_align();
        }
        Control::FontDyslexia => needs_font_asset = store.toggle_dyslexia_font(),
        Control::HideImages => {
            store.toggle_hide_images();
        }
        Control::HideVideo => {
            store.toggle_hide_video();
        }
        Control::ReduceMotion => {
            store.toggle_reduce_motion();
        }
        Control::ChangeCursor => {
            store.cycle_cursor();
        }
        Control::ResetAll => store.reset(),
        Control::Position(position) => {
            if !positions_enabled {
                return None;
            }
            store.set_dock_position(position);
        }
        Control::PanelToggle => return None,
    }
    Some(Transition {
        control,
        needs_font_asset,
    })
}

/// Applies the part of `state` that `control` governs.
pub fn apply(engine: &mut Engine, doc: &mut Document, state: &PreferenceState, control: Control) {
    match control {
        Control::InvertColors | Control::Grayscale | Control::Saturation | Control::Contrast => {
            engine.apply_color_filters(doc, &state.color_filters)
        }
        Control::Underline => engine.set_link_style(doc, state.link_style),
        Control::FontSize => engine.set_font_scale(doc, state.font_scale),
        Control::LineHeight => engine.set_line_height(doc, state.line_height),
        Control::LetterSpacing => engine.set_letter_spacing(doc, state.letter_spacing),
        Control::TextAlign => engine.set_text_align(doc, state.text_align),
        Control::FontDyslexia => engine.set_dyslexia_font(doc, state.dyslexia_font),
        Control::HideImages => engine.set_hide_images(doc, state.hide_images),
        Control::HideVideo => engine.set_hide_video(doc, state.hide_video),
        Control::ReduceMotion => engine.set_reduce_motion(doc, state.reduce_motion.effective()),
        Control::ChangeCursor => engine.set_cursor_style(doc, state.cursor_style),
        Control::ResetAll => engine.apply_all(doc, state),
        Control::Position(_) | Control::PanelToggle => {}
    }
}

fn status_fallback(value: TextAlign) -> &'static str {
    match value {
        TextAlign::Start => "the start edge",
        TextAlign::Center => "the center",
        TextAlign::End => "the end edge",
        TextAlign::Justify => "full justification",
        TextAlign::Unset => "the site default alignment",
    }
}

fn status_key(value: TextAlign) -> &'static str {
    match value {
        TextAlign::Start => "controls.textAlign.status.start",
        TextAlign::Center => "controls.textAlign.status.center",
        TextAlign::End => "controls.textAlign.status.end",
        TextAlign::Justify => "controls.textAlign.status.justify",
        TextAlign::Unset => "controls.textAlign.status.reset",
    }
}

/// Live-region wording for a text-align change, translated when a locale
/// provides it.
pub fn text_align_message(i18n: Option<&I18n>, value: TextAlign) -> String {
    let resolve =
        |key: &str, params: &MessageParams| i18n.and_then(|i18n| i18n.resolve(key, params));
    if value == TextAlign::Unset {
        return resolve("announcements.textAlign.reset", &MessageParams::new())
            .unwrap_or_else(|| "Text alignment restored to the site default.".to_string());
    }
    let label = resolve(status_key(value), &MessageParams::new())
        .unwrap_or_else(|| status_fallback(value).to_string());
    let mut params = MessageParams::new();
    params.insert("value".into(), Value::String(label));
    resolve("announcements.textAlign.set", &params)
        .unwrap_or_else(|| format_template("Text alignment set to {{value}}.", &params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for control in Control::TOOLS.into_iter().chain([Control::ResetAll, Control::PanelToggle]) {
            assert_eq!(Control::from_id(control.id()), Some(control));
        }
        assert_eq!(
            Control::from_id("align-a11y-stiac-bottom-right"),
            Some(Control::Position(DockPosition::BottomRight))
        );
        assert_eq!(Control::from_id("accessibility-modal"), None);
    }

    #[test]
    fn only_enter_and_space_trigger() {
        assert!(Activation::Pointer.triggers());
        assert!(Activation::Key(Key::from_name("Enter")).triggers());
        assert!(Activation::Key(Key::from_name(" ")).triggers());
        assert!(!Activation::Key(Key::from_name("Tab")).triggers());
    }

    #[test]
    fn position_controls_can_be_disabled() {
        let mut store = PreferenceStore::new(DockPosition::BottomLeft);
        let control = Control::Position(DockPosition::Top);
        assert!(transition(&mut store, control, false).is_none());
        assert_eq!(store.get().dock_position, DockPosition::BottomLeft);
        assert!(transition(&mut store, control, true).is_some());
        assert_eq!(store.get().dock_position, DockPosition::Top);
    }

    #[test]
    fn dyslexia_requests_asset_only_when_enabled() {
        let mut store = PreferenceStore::new(DockPosition::BottomLeft);
        let on = transition(&mut store, Control::FontDyslexia, true).unwrap();
        assert!(on.needs_font_asset);
        let off = transition(&mut store, Control::FontDyslexia, true).unwrap();
        assert!(!off.needs_font_asset);
    }

    #[test]
    fn every_cyclic_control_returns_home() {
        let cyclic = Control::TOOLS
            .into_iter()
            .filter(|control| control.progress_segments() > 0);
        for control in cyclic {
            let mut store = PreferenceStore::new(DockPosition::BottomLeft);
            let clicks = control.progress_segments() + 1;
            for _ in 0..clicks {
                transition(&mut store, control, true);
            }
            assert_eq!(*store.get(), PreferenceState::default(), "{}", control.id());
        }
        assert_eq!(Control::TextAlign.progress_segments() + 1, TextAlign::cycle_len());
    }

    #[test]
    fn text_align_messages_fall_back_to_english() {
        assert_eq!(
            text_align_message(None, TextAlign::Center),
            "Text alignment set to the center."
        );
        assert_eq!(
            text_align_message(None, TextAlign::Unset),
            "Text alignment restored to the site default."
        );
    }
}
