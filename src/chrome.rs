/// Widget chrome management
/// This module owns the accessibility menu inserted into the host page.
///
/// Architecture:
/// - The menu is one HTML fragment rooted at #accessibility-modal
/// - A single global <style> carries the marker rules and theme variables
/// - Indicator state (active, aria-pressed, progress) is derived from
///   PreferenceState on every sync, never accumulated
use std::fmt::Write as _;

use html_escape::encode_double_quoted_attribute;

use crate::binder::Control;
use crate::config::{TailwindAsset, ThemeColors, WidgetConfig};
use crate::dom::{DomError, Document, NodeId};
use crate::engine::markers;
use crate::i18n::{native_name, I18n};
use crate::state::{Cycle, DockPosition, Language, PreferenceState};

pub const GLOBAL_STYLE_ID: &str = "a11y-stiac-global-styles";
pub const TAILWIND_ASSET_ID: &str = "stiac-accessibility-tailwind";
pub const TAILWIND_FALLBACK_ATTR: &str = "data-a11y-stiac-tailwind-fallback";
pub const LANGUAGE_SELECT_ID: &str = "a11y-stiac-language-select";
pub const LANGUAGE_ANNOUNCEMENT_ID: &str = "a11y-stiac-language-announcement";
pub const LANGUAGE_ICON_ID: &str = "a11y-stiac-language-icon";
pub const LANGUAGE_ICON_ATTR: &str = "data-language-icon";
pub const TEXT_ALIGN_STATUS_ATTR: &str = "data-text-align-status";
pub const POSITIONS_CONTAINER_ID: &str = "change-positions";
pub const CLOSED_CLASS: &str = "close";

const PROGRESS_PARENT_CLASS: &str = "a11y-stiac-progress-parent";
const PROGRESS_CHILD_CLASS: &str = "a11y-stiac-progress-child";
const ACTIVE_CLASS: &str = "active";
const HIDDEN_CLASS: &str = "hidden";

/// Inserts the global stylesheet, the Tailwind asset and the menu. Mounting
/// twice returns the existing menu root.
pub fn mount(doc: &mut Document, config: &WidgetConfig) -> Result<NodeId, DomError> {
    if let Some(existing) = doc.element_by_id(markers::WIDGET_ROOT_ID) {
        return Ok(existing);
    }
    let Some(body) = doc.body() else {
        return Err(DomError::Missing("body"));
    };

    ensure_global_styles(doc, &config.colors)?;
    if let Some(asset) = config.tailwind_asset() {
        inject_tailwind(doc, &asset)?;
    }

    let nodes = doc.parse_fragment(&widget_markup(config));
    let mut root = None;
    for node in nodes {
        doc.append_child(body, node)?;
        if doc.attribute(node, "id") == Some(markers::WIDGET_ROOT_ID) {
            root = Some(node);
        }
    }
    let root = root.ok_or(DomError::Missing(markers::WIDGET_ROOT_ID))?;
    render_language_options(doc, None, config)?;
    tracing::debug!(target: "a11y::engine", node = %root, "widget chrome mounted");
    Ok(root)
}

fn ensure_global_styles(doc: &mut Document, colors: &ThemeColors) -> Result<(), DomError> {
    if doc.element_by_id(GLOBAL_STYLE_ID).is_some() {
        return Ok(());
    }
    let Some(parent) = doc.head().or_else(|| doc.body()) else {
        return Ok(());
    };
    let style = doc.create_element("style");
    doc.set_attribute(style, "id", GLOBAL_STYLE_ID)?;
    doc.set_attribute(style, markers::WIDGET_OWNED, "")?;
    doc.set_text_content(style, &global_stylesheet(colors))?;
    doc.append_child(parent, style)
}

/// Links the Tailwind build once and flags `<html>` so the fallback rules
/// stand in until it arrives.
fn inject_tailwind(doc: &mut Document, asset: &TailwindAsset) -> Result<(), DomError> {
    if doc.element_by_id(TAILWIND_ASSET_ID).is_some() {
        return Ok(());
    }
    let Some(head) = doc.head() else {
        return Ok(());
    };
    let node = match asset {
        TailwindAsset::Link(href) => {
            let link = doc.create_element("link");
            doc.set_attribute(link, "rel", "stylesheet")?;
            doc.set_attribute(link, "href", href)?;
            link
        }
        TailwindAsset::Script(src) => {
            let script = doc.create_element("script");
            doc.set_attribute(script, "src", src)?;
            script
        }
    };
    doc.set_attribute(node, "id", TAILWIND_ASSET_ID)?;
    doc.set_attribute(node, "data-owner", crate::assets::ASSET_OWNER)?;
    doc.append_child(head, node)?;
    if let Some(html) = doc.document_element() {
        doc.set_attribute(html, TAILWIND_FALLBACK_ATTR, "true")?;
    }
    Ok(())
}

/// Marker rules plus the theme as CSS variables. Rules only ever match under
/// prefixed classes and attributes on `<html>`.
pub fn global_stylesheet(colors: &ThemeColors) -> String {
    let hover = colors.button_hover.as_deref().unwrap_or(&colors.button_active);
    let text = colors.text.as_deref().unwrap_or("#0f172a");
    let header = colors.header_background.as_deref().unwrap_or(&colors.button_active);
    let control_active = colors.control_active.as_deref().unwrap_or(&colors.button_active);
    format!(
        r#":root {{
    --a11y-stiac-color-1: {button_active};
    --a11y-stiac-color-2: {button};
    --a11y-stiac-color-3: {hover};
    --a11y-stiac-text: {text};
    --a11y-stiac-header-background: {header};
    --a11y-stiac-header-text: {header_text};
    --a11y-stiac-control-active: {control_active};
    --a11y-stiac-control-active-text: {control_active_text};
}}

#accessibility-modal {{
    position: fixed;
    z-index: 99999999;
    color: var(--a11y-stiac-text);
}}
#accessibility-modal.close #accessibility-tools,
#accessibility-modal.close #headerContent,
#accessibility-modal.close #language-selector,
#accessibility-modal.close #a11y-stiac-footer {{
    display: none;
}}
#accessibility-modal.left {{ left: 1rem; top: 50%; }}
#accessibility-modal.right {{ right: 1rem; top: 50%; }}
#accessibility-modal.top {{ top: 1rem; left: 50%; }}
#accessibility-modal.bottom {{ bottom: 1rem; left: 50%; }}
#accessibility-modal.bottom-left {{ bottom: 1rem; left: 1rem; }}
#accessibility-modal.bottom-right {{ bottom: 1rem; right: 1rem; }}
#closeBtn, #reset-all {{
    background-color: var(--a11y-stiac-color-1);
    color: var(--a11y-stiac-header-text);
}}
#headerContent {{
    background-color: var(--a11y-stiac-header-background);
    color: var(--a11y-stiac-header-text);
}}
.a11y-stiac-child {{
    background-color: var(--a11y-stiac-color-2);
    cursor: pointer;
}}
.a11y-stiac-child.active {{
    background-color: var(--a11y-stiac-control-active);
    color: var(--a11y-stiac-control-active-text);
}}
.a11y-stiac-progress-parent {{ display: flex; gap: 4px; }}
.a11y-stiac-progress-parent.hidden {{ display: none; }}
#language-selector [data-language-icon].hidden {{ display: none; }}
.a11y-stiac-progress-child {{ height: 4px; width: 16px; border-radius: 2px; opacity: 0.3; }}
.a11y-stiac-progress-child.active {{ opacity: 1; }}
.a11y-stiac-sr-only {{
    position: absolute;
    width: 1px;
    height: 1px;
    overflow: hidden;
    clip: rect(0 0 0 0);
    white-space: nowrap;
}}

html.a11y-stiac-underline-style-0 body a {{ text-decoration: underline !important; }}
html.a11y-stiac-underline-style-1 body a {{ background-color: #fde047 !important; color: #000000 !important; }}
html.a11y-stiac-underline-style-2 body a {{ outline: 2px solid var(--a11y-stiac-color-1) !important; }}
html.a11y-stiac-line-height-0 body :where(:not(#accessibility-modal, #accessibility-modal *)) {{ line-height: 1.5 !important; }}
html.a11y-stiac-line-height-1 body :where(:not(#accessibility-modal, #accessibility-modal *)) {{ line-height: 1.8 !important; }}
html.a11y-stiac-line-height-2 body :where(:not(#accessibility-modal, #accessibility-modal *)) {{ line-height: 2 !important; }}
html[data-a11y-stiac-text-align="start"] body :where(:not(#accessibility-modal, #accessibility-modal *)) {{ text-align: start !important; }}
html[data-a11y-stiac-text-align="center"] body :where(:not(#accessibility-modal, #accessibility-modal *)) {{ text-align: center !important; }}
html[data-a11y-stiac-text-align="end"] body :where(:not(#accessibility-modal, #accessibility-modal *)) {{ text-align: end !important; }}
html[data-a11y-stiac-text-align="justify"] body :where(:not(#accessibility-modal, #accessibility-modal *)) {{ text-align: justify !important; }}
html[data-a11y-stiac-dyslexia-font] body :not(#accessibility-modal, #accessibility-modal *) {{ font-family: "OpenDyslexic", "Comic Sans MS", sans-serif !important; }}
html.a11y-stiac-hide-images body :where(img, picture, svg, canvas, [role="img"]):not(#accessibility-modal *, [data-a11y-stiac-preserve-images] *) {{
    display: none !important;
}}
html.a11y-stiac-hide-video body :where(video, iframe, embed, object):not(#accessibility-modal *, [data-a11y-stiac-preserve-video] *) {{
    display: none !important;
}}
html.a11y-stiac-reduce-motion body :where(:not(#accessibility-modal, #accessibility-modal *)) {{
    animation: none !important;
    transition: none !important;
    scroll-behavior: auto !important;
}}
#accessibility-modal, #accessibility-modal * {{
    letter-spacing: 0 !important;
    line-height: 1.25 !important;
    text-align: left !important;
}}

#cursor {{ position: fixed; pointer-events: none; z-index: 99999998; display: none; }}
#cursor.cursor-0 {{ display: block; border-radius: 50%; border: 3px solid var(--a11y-stiac-color-1); }}
#cursor.cursor-1 {{ display: block; left: 0; box-shadow: 0 0 0 100vmax rgba(0, 0, 0, 0.6); }}
#cursor.cursor-2 {{ display: block; background-color: var(--a11y-stiac-color-1); border-radius: 4px; }}
#triangle-cursor {{ position: fixed; pointer-events: none; display: none; }}

html[data-a11y-stiac-tailwind-fallback] #accessibility-tools {{
    display: grid;
    grid-template-columns: repeat(2, minmax(0, 1fr));
    gap: 0.75rem;
}}
"#,
        button_active = colors.button_active,
        button = colors.button,
        header_text = colors.header_text,
        control_active_text = colors.control_active_text,
    )
}

/// The menu fragment. Labels carry English text and are rewritten by the
/// i18n layer once a locale is applied.
pub fn widget_markup(config: &WidgetConfig) -> String {
    let mut tools = String::new();
    for control in Control::TOOLS {
        tools.push_str(&tool_markup(control));
    }
    let positions = if config.position_controls_enabled {
        position_markup()
    } else {
        String::new()
    };

    format!(
        r#"<div id="{root}" class="{position} {closed}" {owned} {preserve} role="dialog" aria-label="Accessibility Tools">
    <button id="closeBtn" type="button" aria-label="Toggle accessibility panel" data-i18n-attr="aria-label:controls.panelToggle.ariaLabel">
        <span aria-hidden="true">&#9855;</span>
    </button>
    <div id="headerContent">
        <p class="text-lg font-semibold" data-i18n="controls.heading.title">Accessibility Tools</p>
        <p class="text-sm" data-i18n="controls.heading.subtitle">Fine-tune colours, typography and focus helpers with a refreshed look.</p>
    </div>
    <div id="language-selector">
        <label id="a11y-stiac-language-label" for="{select}" data-i18n="language.selectorLabel">Language</label>
        <span id="{icon}" {icon_attr} aria-hidden="true"></span>
        <select id="{select}" aria-describedby="a11y-stiac-language-help"></select>
        <p id="a11y-stiac-language-help" class="text-xs" data-i18n="language.selectorDescription">Choose the language used for the accessibility tools interface.</p>
    </div>
    <div id="accessibility-tools">
{tools}    </div>
    <div id="{cursor}"></div>
    <div id="{triangle}"></div>
    <div id="a11y-stiac-footer">
        <button id="{reset}" type="button" data-i18n="controls.resetAll.label">Reset All</button>
{positions}        <p id="{announcement}" class="a11y-stiac-sr-only" aria-live="polite" role="status"></p>
    </div>
</div>"#,
        root = markers::WIDGET_ROOT_ID,
        position = config.default_position.as_str(),
        closed = CLOSED_CLASS,
        owned = markers::WIDGET_OWNED,
        preserve = markers::PRESERVE_IMAGES,
        select = LANGUAGE_SELECT_ID,
        icon = LANGUAGE_ICON_ID,
        icon_attr = LANGUAGE_ICON_ATTR,
        cursor = markers::CURSOR_ID,
        triangle = markers::TRIANGLE_CURSOR_ID,
        reset = Control::ResetAll.id(),
        announcement = LANGUAGE_ANNOUNCEMENT_ID,
    )
}

fn tool_markup(control: Control) -> String {
    let id = control.id();
    let mut out = String::new();
    let described = control
        .description()
        .map(|_| format!(r#" aria-describedby="{id}-description""#));
    let _ = writeln!(
        out,
        r#"        <div class="a11y-stiac-child" id="{id}" role="button" tabindex="0" aria-pressed="false"{described}>"#,
        described = described.unwrap_or_default(),
    );
    if let Some((key, label)) = control.label() {
        let _ = writeln!(
            out,
            r#"            <p class="text-sm font-semibold" data-i18n="{key}">{label}</p>"#
        );
    }
    if let Some((key, text)) = control.description() {
        let _ = writeln!(
            out,
            r#"            <p id="{id}-description" class="a11y-stiac-sr-only" data-i18n="{key}">{text}</p>"#
        );
    }
    let segments = control.progress_segments();
    if segments > 0 {
        let _ = write!(out, r#"            <div class="{PROGRESS_PARENT_CLASS} {HIDDEN_CLASS}">"#);
        for _ in 0..segments {
            let _ = write!(out, r#"<div class="{PROGRESS_CHILD_CLASS}"></div>"#);
        }
        out.push_str("</div>\n");
    }
    if control == Control::TextAlign {
        let _ = writeln!(
            out,
            r#"            <p class="a11y-stiac-sr-only" {TEXT_ALIGN_STATUS_ATTR} role="status" aria-live="polite"></p>"#
        );
    }
    out.push_str("        </div>\n");
    out
}

fn position_markup() -> String {
    let mut out = format!("        <div id=\"{POSITIONS_CONTAINER_ID}\">\n");
    for position in POSITION_BUTTON_ORDER {
        let id = position.control_id();
        let key = position_label_key(id);
        let _ = writeln!(
            out,
            r#"            <button id="{id}" type="button" aria-pressed="false" data-i18n-attr="aria-label:{key}, title:{key}"></button>"#
        );
    }
    out.push_str("        </div>\n");
    out
}

const POSITION_BUTTON_ORDER: [DockPosition; 6] = [
    DockPosition::Top,
    DockPosition::Left,
    DockPosition::Bottom,
    DockPosition::BottomLeft,
    DockPosition::BottomRight,
    DockPosition::Right,
];

/// `align-a11y-stiac-top-left` → `controls.position.topLeft`.
fn position_label_key(control_id: &str) -> String {
    let bare = control_id.trim_start_matches("align-a11y-stiac-");
    let mut key = String::from("controls.position.");
    let mut upper = false;
    for ch in bare.chars() {
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

/// Fills the language `<select>` with one option per supported language and
/// marks the active one.
pub fn render_language_options(
    doc: &mut Document,
    i18n: Option<&I18n>,
    config: &WidgetConfig,
) -> Result<(), DomError> {
    let Some(select) = doc.element_by_id(LANGUAGE_SELECT_ID) else {
        return Ok(());
    };
    let current = i18n.map(I18n::current_language).unwrap_or(config.default_language);
    let languages: Vec<Language> = match i18n {
        Some(i18n) => i18n.supported_languages().to_vec(),
        None => config.supported_languages.clone(),
    };

    let mut options = String::new();
    for language in languages {
        let name = match i18n {
            Some(i18n) => i18n.language_name(language, config.translate_language_names),
            None => native_name(language).to_string(),
        };
        let selected = if language == current { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{code}"{selected}>{name}</option>"#,
            code = language.code(),
            name = encode_double_quoted_attribute(&name),
        );
    }

    for child in doc.children(select).to_vec() {
        doc.remove_node(child)?;
    }
    for option in doc.parse_fragment(&format!("<select>{options}</select>")) {
        let nested: Vec<NodeId> = if doc.tag_name(option) == Some("select") {
            doc.children(option).to_vec()
        } else {
            vec![option]
        };
        for node in nested {
            doc.append_child(select, node)?;
        }
    }
    if let Some(icon) = doc.element_by_id(LANGUAGE_ICON_ID) {
        doc.set_text_content(icon, &current.code().to_ascii_uppercase())?;
    }
    Ok(())
}

/// Brings every indicator in line with `state`.
pub fn sync(doc: &mut Document, state: &PreferenceState, config: &WidgetConfig) {
    for control in Control::TOOLS {
        let Some(node) = doc.element_by_id(control.id()) else {
            continue;
        };
        let (active, progress) = indicator(control, state);
        if let Err(err) = set_indicator(doc, node, active, progress) {
            tracing::debug!(target: "a11y::engine", control = control.id(), error = %err, "unable to sync control");
        }
    }
    if let Err(err) = set_position(doc, state.dock_position) {
        tracing::debug!(target: "a11y::engine", error = %err, "unable to sync dock position");
    }
    let hide_icons = state.hide_images && !config.preserve_language_icons;
    if let Err(err) = set_language_icons_hidden(doc, hide_icons) {
        tracing::debug!(target: "a11y::engine", error = %err, "unable to sync language icons");
    }
}

/// Language icons follow hide-images like host pictures do, unless the
/// embed asked to keep them.
fn set_language_icons_hidden(doc: &mut Document, hidden: bool) -> Result<(), DomError> {
    let Some(selector) = doc.element_by_id("language-selector") else {
        return Ok(());
    };
    let icons: Vec<NodeId> = doc
        .subtree(selector)
        .into_iter()
        .filter(|node| doc.has_attribute(*node, LANGUAGE_ICON_ATTR))
        .collect();
    for icon in icons {
        if hidden {
            doc.add_class(icon, HIDDEN_CLASS)?;
        } else {
            doc.remove_class(icon, HIDDEN_CLASS)?;
        }
    }
    Ok(())
}

/// Active flag and progress index for one control.
fn indicator(control: Control, state: &PreferenceState) -> (bool, Option<usize>) {
    let filters = &state.color_filters;
    match control {
        Control::InvertColors => (filters.invert, None),
        Control::Grayscale => (filters.grayscale, None),
        Control::Saturation => cyclic(filters.saturation),
        Control::Contrast => cyclic(filters.contrast),
        Control::Underline => cyclic(state.link_style),
        Control::FontSize => cyclic(state.font_scale),
        Control::LineHeight => cyclic(state.line_height),
        Control::LetterSpacing => cyclic(state.letter_spacing),
        Control::TextAlign => cyclic(state.text_align),
        Control::FontDyslexia => (state.dyslexia_font, None),
        Control::HideImages => (state.hide_images, None),
        Control::HideVideo => (state.hide_video, None),
        Control::ReduceMotion => (state.reduce_motion.effective(), None),
        Control::ChangeCursor => cyclic(state.cursor_style),
        Control::ResetAll | Control::PanelToggle | Control::Position(_) => (false, None),
    }
}

fn cyclic<T: Cycle>(value: T) -> (bool, Option<usize>) {
    (!value.is_default(), value.progress_index())
}

fn set_indicator(
    doc: &mut Document,
    node: NodeId,
    active: bool,
    progress: Option<usize>,
) -> Result<(), DomError> {
    doc.toggle_class(node, ACTIVE_CLASS, active)?;
    doc.set_attribute(node, "aria-pressed", if active { "true" } else { "false" })?;

    let Some(parent) = doc
        .children(node)
        .iter()
        .copied()
        .find(|child| doc.has_class(*child, PROGRESS_PARENT_CLASS))
    else {
        return Ok(());
    };
    doc.toggle_class(parent, HIDDEN_CLASS, progress.is_none())?;
    let segments: Vec<NodeId> = doc
        .children(parent)
        .iter()
        .copied()
        .filter(|child| doc.has_class(*child, PROGRESS_CHILD_CLASS))
        .collect();
    for (index, segment) in segments.into_iter().enumerate() {
        doc.toggle_class(segment, ACTIVE_CLASS, progress == Some(index))?;
    }
    Ok(())
}

/// Moves the menu to `position` and presses the matching dock button.
pub fn set_position(doc: &mut Document, position: DockPosition) -> Result<(), DomError> {
    let Some(root) = doc.element_by_id(markers::WIDGET_ROOT_ID) else {
        return Ok(());
    };
    for candidate in DockPosition::ALL {
        doc.toggle_class(root, candidate.as_str(), candidate == position)?;
        if let Some(button) = doc.element_by_id(candidate.control_id()) {
            let pressed = if candidate == position { "true" } else { "false" };
            doc.set_attribute(button, "aria-pressed", pressed)?;
        }
    }
    Ok(())
}

/// Opens or closes the panel and returns whether it is now open.
pub fn toggle_panel(doc: &mut Document) -> Result<bool, DomError> {
    let Some(root) = doc.element_by_id(markers::WIDGET_ROOT_ID) else {
        return Ok(false);
    };
    let open = doc.has_class(root, CLOSED_CLASS);
    doc.toggle_class(root, CLOSED_CLASS, !open)?;
    if let Some(button) = doc.element_by_id(Control::PanelToggle.id()) {
        doc.set_attribute(button, "aria-expanded", if open { "true" } else { "false" })?;
    }
    Ok(open)
}

/// Writes the live text-align status under the text-align control.
pub fn set_text_align_status(doc: &mut Document, message: &str) -> Result<(), DomError> {
    let Some(control) = doc.element_by_id(Control::TextAlign.id()) else {
        return Ok(());
    };
    let status = doc
        .subtree(control)
        .into_iter()
        .find(|node| doc.has_attribute(*node, TEXT_ALIGN_STATUS_ATTR));
    match status {
        Some(status) => doc.set_text_content(status, message),
        None => Ok(()),
    }
}
