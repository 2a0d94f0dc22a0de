/// Integration tests for saving and restoring preferences across page loads
/// Each "load" is a fresh document and widget over the same on-disk store.
use a11y_stiac::assets::AssetFetcher;
use a11y_stiac::engine::markers;
use a11y_stiac::persistence::SETTINGS_KEY;
use a11y_stiac::state::{
    Contrast, CursorStyle, DockPosition, FontScale, LetterSpacing, LineHeight, LinkStyle,
    PreferenceState, Saturation, TextAlign,
};
use a11y_stiac::storage::KeyValueStore;
use a11y_stiac::{Document, MemoryStore, SqliteStore, WidgetConfig, WidgetContext};
use tempfile::TempDir;

const PAGE: &str = r#"<html><head></head><body><p id="copy">Copy</p><div id="hero" style="background-image: url(a.png)">Hero</div></body></html>"#;

fn load(store: Box<dyn KeyValueStore>) -> (Document, WidgetContext) {
    let mut doc = Document::parse_html(PAGE);
    let config = WidgetConfig {
        position_controls_enabled: true,
        ..WidgetConfig::default()
    };
    let mut widget = WidgetContext::new(config, store, AssetFetcher::new(None));
    widget.mount(&mut doc).unwrap();
    widget.restore(&mut doc, false);
    (doc, widget)
}

fn click(widget: &mut WidgetContext, doc: &mut Document, id: &str) {
    let node = doc.element_by_id(id).unwrap();
    widget.activate(doc, node, a11y_stiac::binder::Activation::Pointer);
}

#[test]
fn test_every_setting_survives_reload() {
    let dir = TempDir::new().unwrap();

    let expected = {
        let store = SqliteStore::new_with_path(dir.path()).unwrap();
        let (mut doc, mut widget) = load(Box::new(store));
        let clicks = [
            "invert-colors", "grayscale", "saturation", "saturation", "contrast", "contrast",
            "contrast", "underline", "underline", "font-size", "font-size", "line-height",
            "letter-spacing", "letter-spacing", "letter-spacing", "text-align", "text-align",
            "font-dyslexia", "hide-images", "hide-video", "reduce-motion", "change-cursor",
            "change-cursor", "align-a11y-stiac-top",
        ];
        for id in clicks {
            click(&mut widget, &mut doc, id);
        }
        *widget.state()
    };

    assert!(expected.color_filters.invert);
    assert!(expected.color_filters.grayscale);
    assert_eq!(expected.color_filters.saturation, Saturation::High);
    assert_eq!(expected.color_filters.contrast, Contrast::Extra);
    assert_eq!(expected.link_style, LinkStyle::Style1);
    assert_eq!(expected.font_scale, FontScale::LARGER);
    assert_eq!(expected.line_height, LineHeight::Relaxed);
    assert_eq!(expected.letter_spacing, LetterSpacing::Wider);
    assert_eq!(expected.text_align, TextAlign::Center);
    assert_eq!(expected.cursor_style, CursorStyle::Mask);
    assert_eq!(expected.dock_position, DockPosition::Top);
    assert_eq!(expected.reduce_motion.user, Some(true));

    let store = SqliteStore::new_with_path(dir.path()).unwrap();
    let (doc, widget) = load(Box::new(store));
    assert_eq!(*widget.state(), expected);

    let copy = doc.element_by_id("copy").unwrap();
    assert_eq!(doc.style_property(copy, "font-size").as_deref(), Some("24px"));
    let hero = doc.element_by_id("hero").unwrap();
    assert_eq!(doc.style_property(hero, "background-image").as_deref(), Some("none"));
    let html = doc.document_element().unwrap();
    assert_eq!(doc.attribute(html, markers::TEXT_ALIGN_ATTR), Some("center"));
    assert!(doc.has_class(html, "a11y-stiac-line-height-0"));
    assert!(doc.has_class(doc.element_by_id("font-size").unwrap(), "active"));
}

#[test]
fn test_legacy_payload_migrates() {
    let legacy = r#"{"invertColors":true,"lowSaturation":true,"accPosition":"left"}"#;
    let (doc, widget) = load(Box::new(MemoryStore::with_entry(SETTINGS_KEY, legacy)));

    let state = widget.state();
    assert!(state.color_filters.invert);
    assert_eq!(state.color_filters.saturation, Saturation::Low);
    assert_eq!(state.dock_position, DockPosition::Left);
    assert_eq!(state.reduce_motion.user, Some(false));
    let html = doc.document_element().unwrap();
    assert!(doc
        .style_property(html, "filter")
        .unwrap_or_default()
        .contains("invert(1)"));
}

#[test]
fn test_corrupt_payload_falls_back_to_defaults() {
    let (_doc, widget) = load(Box::new(MemoryStore::with_entry(SETTINGS_KEY, "{not json")));
    assert_eq!(*widget.state(), PreferenceState::default());
}

#[test]
fn test_save_writes_current_envelope() {
    let (mut doc, mut widget) = load(Box::new(MemoryStore::new()));
    click(&mut widget, &mut doc, "font-size");

    let raw = widget.storage().get(SETTINGS_KEY).unwrap().unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["version"], 5);
    assert_eq!(saved["fontSize"], "130%");
    assert_eq!(saved["reduceMotion"], false);
    assert_eq!(saved["reduceMotionLocked"], false);
}
