//! Author stylesheet cascade.
//!
//! Supports the selector subset host pages and the widget's own global
//! stylesheet need for computed-style reads: type, `*`, `#id`, `.class`,
//! `[attr]`, `[attr=value]`, `:root`, `:not(...)`, `:where(...)`,
//! compounds, the descendant combinator and selector lists. Rules with
//! anything else (other pseudo-classes, child or sibling combinators) never
//! match. At-rules are skipped whole.

use super::style::{parse_declarations, split_top_level, Declaration, InlineStyle};
use super::{Document, NodeId};

pub(crate) const DEFAULT_FONT_SIZE_PX: f64 = 16.0;

const INHERITED: &[&str] = &[
    "font-size",
    "font-family",
    "line-height",
    "letter-spacing",
    "text-align",
    "color",
    "cursor",
    "visibility",
];

pub(crate) fn is_inherited(property: &str) -> bool {
    INHERITED.contains(&property)
}

pub(crate) fn initial_value(property: &str) -> &'static str {
    match property {
        "display" => "inline",
        "background-image" | "filter" | "animation-name" => "none",
        "cursor" => "auto",
        "line-height" | "letter-spacing" => "normal",
        "text-align" => "start",
        "visibility" => "visible",
        "font-family" => "serif",
        "color" => "canvastext",
        _ => "",
    }
}

#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
}

#[derive(Debug, Clone)]
pub struct StyleRule {
    selectors: Vec<Selector>,
    declarations: Vec<Declaration>,
    order: usize,
}

impl StyleRule {
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }
}

impl StyleSheet {
    pub fn parse(css: &str) -> Self {
        let mut sheet = Self::default();
        sheet.extend_from_css(css);
        sheet
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn extend_from_css(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();
        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let Some(close) = matching_brace(rest, open) else {
                break;
            };
            let body = &rest[open + 1..close];
            rest = &rest[close + 1..];
            if prelude.starts_with('@') {
                continue;
            }
            let selectors: Vec<Selector> = split_selector_list(prelude)
                .into_iter()
                .filter_map(|raw| Selector::parse(raw.trim()))
                .collect();
            if selectors.is_empty() {
                continue;
            }
            let order = self.rules.len();
            self.rules.push(StyleRule {
                selectors,
                declarations: parse_declarations(body),
                order,
            });
        }
    }

    /// Winning declared value for `property` on `node`, before inheritance.
    ///
    /// Ranking: inline `!important`, author `!important`, inline normal,
    /// author normal; ties inside the author origin go to specificity and
    /// then to source order.
    pub(crate) fn cascaded_value(
        &self,
        document: &Document,
        node: NodeId,
        property: &str,
    ) -> Option<String> {
        let inline = InlineStyle::parse(document.attribute(node, "style").unwrap_or(""));
        let inline = inline.get(property).cloned();
        if let Some(declaration) = inline.as_ref().filter(|d| d.important) {
            return Some(declaration.value.clone());
        }

        let mut best: Option<((bool, Specificity, usize), &Declaration)> = None;
        for rule in &self.rules {
            let Some(specificity) = rule
                .selectors
                .iter()
                .filter(|selector| selector.matches(document, node))
                .map(Selector::specificity)
                .max()
            else {
                continue;
            };
            for declaration in rule.declarations.iter().filter(|d| d.property == property) {
                let rank = (declaration.important, specificity, rule.order);
                if best.as_ref().map(|(current, _)| rank >= *current).unwrap_or(true) {
                    best = Some((rank, declaration));
                }
            }
        }

        match (best, inline) {
            (Some(((true, _, _), declaration)), _) => Some(declaration.value.clone()),
            (_, Some(declaration)) => Some(declaration.value),
            (Some((_, declaration)), None) => Some(declaration.value.clone()),
            (None, None) => None,
        }
    }
}

/// Splits on commas outside parentheses, so `:where(a, b)` stays whole.
fn split_selector_list(prelude: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in prelude.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&prelude[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&prelude[start..]);
    parts
}

fn strip_comments(css: &str) -> String {
    let mut output = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        output.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return output,
        }
    }
    output.push_str(rest);
    output
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + index);
                }
            }
            _ => {}
        }
    }
    None
}

/// (ids, classes + attributes, types)
pub type Specificity = (u32, u32, u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
    pseudo: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pseudo {
    Root,
    Not(Vec<Selector>),
    /// Matches like its argument list but adds no specificity.
    Where(Vec<Selector>),
}

impl Selector {
    pub fn parse(raw: &str) -> Option<Self> {
        let compounds = split_compounds(raw.trim())?
            .into_iter()
            .map(Compound::parse)
            .collect::<Option<Vec<_>>>()?;
        if compounds.is_empty() {
            return None;
        }
        Some(Self { compounds })
    }

    pub fn specificity(&self) -> Specificity {
        self.compounds
            .iter()
            .map(Compound::specificity)
            .fold((0, 0, 0), add_specificity)
    }

    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(document, node) {
            return false;
        }
        let mut cursor = document.parent_element(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = cursor else {
                    return false;
                };
                cursor = document.parent_element(candidate);
                if compound.matches(document, candidate) {
                    break;
                }
            }
        }
        true
    }
}

fn add_specificity(a: Specificity, b: Specificity) -> Specificity {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}

/// Splits a complex selector on descendant whitespace outside parentheses,
/// brackets and quotes. Child and sibling combinators make it unsupported.
fn split_compounds(raw: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;
    for (index, ch) in raw.char_indices() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '>' | '+' | '~' if depth == 0 => return None,
            _ => {}
        }
        if depth == 0 && ch.is_ascii_whitespace() {
            if let Some(begin) = start.take() {
                parts.push(&raw[begin..index]);
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(begin) = start {
        parts.push(&raw[begin..]);
    }
    Some(parts)
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + index);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_selector_list(raw: &str) -> Option<Vec<Selector>> {
    let selectors = split_selector_list(raw)
        .into_iter()
        .map(Selector::parse)
        .collect::<Option<Vec<_>>>()?;
    (!selectors.is_empty()).then_some(selectors)
}

const COMPOUND_MARKERS: [char; 4] = ['#', '.', '[', ':'];

impl Compound {
    fn parse(raw: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut rest = raw;

        let tag_len = rest.find(COMPOUND_MARKERS).unwrap_or(rest.len());
        let tag = &rest[..tag_len];
        if !tag.is_empty() && tag != "*" {
            if !is_ident(tag) {
                return None;
            }
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_len..];

        while !rest.is_empty() {
            let marker = rest.chars().next()?;
            match marker {
                '#' | '.' => {
                    let body = &rest[1..];
                    let len = body.find(COMPOUND_MARKERS).unwrap_or(body.len());
                    let name = &body[..len];
                    if !is_ident(name) {
                        return None;
                    }
                    if marker == '#' {
                        compound.id = Some(name.to_string());
                    } else {
                        compound.classes.push(name.to_string());
                    }
                    rest = &body[len..];
                }
                '[' => {
                    let close = rest.find(']')?;
                    let inner = &rest[1..close];
                    let attribute = match inner.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim().trim_matches(['"', '\'']).to_string();
                            (name.trim().to_ascii_lowercase(), Some(value))
                        }
                        None => (inner.trim().to_ascii_lowercase(), None),
                    };
                    if !is_ident(&attribute.0) {
                        return None;
                    }
                    compound.attributes.push(attribute);
                    rest = &rest[close + 1..];
                }
                ':' => {
                    let body = &rest[1..];
                    let len = body.find(['#', '.', '[', ':', '(']).unwrap_or(body.len());
                    let name = body[..len].to_ascii_lowercase();
                    let after = &body[len..];
                    if after.starts_with('(') {
                        let close = matching_paren(after, 0)?;
                        let arguments = parse_selector_list(&after[1..close])?;
                        compound.pseudo.push(match name.as_str() {
                            "not" => Pseudo::Not(arguments),
                            "where" => Pseudo::Where(arguments),
                            _ => return None,
                        });
                        rest = &after[close + 1..];
                    } else {
                        if name != "root" {
                            return None;
                        }
                        compound.pseudo.push(Pseudo::Root);
                        rest = after;
                    }
                }
                _ => return None,
            }
        }
        Some(compound)
    }

    fn specificity(&self) -> Specificity {
        let own = (
            u32::from(self.id.is_some()),
            (self.classes.len() + self.attributes.len()) as u32,
            u32::from(self.tag.is_some()),
        );
        self.pseudo.iter().fold(own, |acc, pseudo| {
            let extra = match pseudo {
                Pseudo::Root => (0, 1, 0),
                Pseudo::Not(arguments) => arguments
                    .iter()
                    .map(Selector::specificity)
                    .max()
                    .unwrap_or_default(),
                Pseudo::Where(_) => (0, 0, 0),
            };
            add_specificity(acc, extra)
        })
    }

    fn matches(&self, document: &Document, node: NodeId) -> bool {
        let Some(element) = document.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if element.tag() != tag.as_str() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| document.has_class(node, class)) {
            return false;
        }
        let attributes_match = self.attributes.iter().all(|(name, expected)| {
            match (element.attribute(name), expected) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            }
        });
        attributes_match
            && self.pseudo.iter().all(|pseudo| match pseudo {
                Pseudo::Root => document.document_element() == Some(node),
                Pseudo::Not(arguments) => !arguments.iter().any(|s| s.matches(document, node)),
                Pseudo::Where(arguments) => arguments.iter().any(|s| s.matches(document, node)),
            })
    }
}

fn is_ident(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// Resolves a declared `font-size` to pixels. Unknown syntax yields `None`
/// so the caller can fall back to inheritance.
pub(crate) fn resolve_font_size(value: &str, parent_px: f64, root_px: f64) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let keyword = match value.as_str() {
        "inherit" | "unset" => Some(parent_px),
        "initial" | "medium" => Some(DEFAULT_FONT_SIZE_PX),
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent_px / 1.2),
        "larger" => Some(parent_px * 1.2),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }
    let number = |suffix: &str| -> Option<f64> {
        value.strip_suffix(suffix)?.trim().parse::<f64>().ok()
    };
    if let Some(px) = number("px") {
        return Some(px);
    }
    if let Some(rem) = number("rem") {
        return Some(rem * root_px);
    }
    if let Some(em) = number("em") {
        return Some(em * parent_px);
    }
    if let Some(percent) = number("%") {
        return Some(percent / 100.0 * parent_px);
    }
    if let Some(pt) = number("pt") {
        return Some(pt * 4.0 / 3.0);
    }
    None
}

/// First image layer named in a `background` shorthand.
pub(crate) fn image_from_background_shorthand(shorthand: &str) -> Option<String> {
    let lowered = shorthand.to_ascii_lowercase();
    let start = ["url(", "linear-gradient(", "radial-gradient(", "image-set("]
        .iter()
        .filter_map(|function| lowered.find(function))
        .min()?;
    let tail = &shorthand[start..];
    let end = split_top_level(tail, ' ').first().map(|token| token.len())?;
    let image = tail[..end].trim_end_matches(',');
    Some(image.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_with(html_class: &str) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let html = doc.document_element().unwrap();
        doc.set_attribute(html, "class", html_class).unwrap();
        let body = doc.body().unwrap();
        let p = doc.create_element("p");
        doc.append_child(body, p).unwrap();
        (doc, html, p)
    }

    fn add_style(doc: &mut Document, css: &str) {
        let head = doc.head().unwrap();
        let style = doc.create_element("style");
        let text = doc.create_text(css);
        doc.append_child(style, text).unwrap();
        doc.append_child(head, style).unwrap();
    }

    #[test]
    fn specificity_and_order() {
        let (mut doc, _, p) = document_with("");
        doc.set_attribute(p, "class", "note").unwrap();
        add_style(&mut doc, "p.note { color: blue } p { color: red } .note { color: green }");
        assert_eq!(doc.computed_style(p, "color").unwrap(), "blue");
    }

    #[test]
    fn important_beats_inline() {
        let (mut doc, _, p) = document_with("");
        add_style(&mut doc, "p { color: red !important }");
        doc.set_attribute(p, "style", "color: blue").unwrap();
        assert_eq!(doc.computed_style(p, "color").unwrap(), "red");
        doc.set_attribute(p, "style", "color: blue !important").unwrap();
        assert_eq!(doc.computed_style(p, "color").unwrap(), "blue");
    }

    #[test]
    fn descendant_combinator_through_root_marker() {
        let (mut doc, _, p) = document_with("a11y-stiac-hide-images");
        add_style(&mut doc, "html.a11y-stiac-hide-images p { display: none }");
        assert_eq!(doc.computed_style(p, "display").unwrap(), "none");
        let html = doc.document_element().unwrap();
        doc.remove_class(html, "a11y-stiac-hide-images").unwrap();
        assert_eq!(doc.computed_style(p, "display").unwrap(), "inline");
    }

    #[test]
    fn font_size_resolves_relative_units() {
        let (mut doc, _, p) = document_with("");
        add_style(
            &mut doc,
            "html { font-size: 20px } body { font-size: 0.5em } p { font-size: 1.5rem }",
        );
        assert_eq!(doc.computed_style(p, "font-size").unwrap(), "30px");
        doc.set_attribute(p, "style", "font-size: 200%").unwrap();
        assert_eq!(doc.computed_style(p, "font-size").unwrap(), "20px");
    }

    #[test]
    fn background_shorthand_contributes_image() {
        let (mut doc, _, p) = document_with("");
        add_style(&mut doc, "p { background: #fff url(\"hero.jpg\") no-repeat center }");
        assert_eq!(
            doc.computed_style(p, "background-image").unwrap(),
            "url(\"hero.jpg\")"
        );
    }

    #[test]
    fn unsupported_selectors_are_skipped() {
        let sheet = StyleSheet::parse(
            "a:hover { color: red } @media print { p { color: red } } ul > li { x: y } li { x: z }",
        );
        assert_eq!(sheet.rules().len(), 1);
    }

    #[test]
    fn functional_selector_lists_stay_whole() {
        let sheet = StyleSheet::parse(
            "html.x body :where(img, svg):not(#menu *) { display: none } img, .y { z: 1 }",
        );
        assert_eq!(sheet.rules().len(), 2);
        assert_eq!(sheet.rules()[0].selectors().len(), 1);
        assert_eq!(sheet.rules()[1].selectors().len(), 2);
    }

    #[test]
    fn not_excludes_a_subtree() {
        let mut doc = Document::parse_html(
            "<div id=menu><p id=inside>menu</p></div><p id=outside>page</p>",
        );
        add_style(
            &mut doc,
            "html.centered body :where(:not(#menu, #menu *)) { text-align: center !important }",
        );
        let html = doc.document_element().unwrap();
        doc.set_attribute(html, "class", "centered").unwrap();
        let inside = doc.element_by_id("inside").unwrap();
        let outside = doc.element_by_id("outside").unwrap();
        let menu = doc.element_by_id("menu").unwrap();
        assert_eq!(doc.computed_style(outside, "text-align").unwrap(), "center");
        assert_eq!(doc.computed_style(menu, "text-align").unwrap(), "start");
        assert_eq!(doc.computed_style(inside, "text-align").unwrap(), "start");
    }

    #[test]
    fn where_adds_no_specificity() {
        let plain = Selector::parse("p").unwrap();
        let wrapped = Selector::parse("p:where(#a, .b)").unwrap();
        let negated = Selector::parse("p:not(#a, .b)").unwrap();
        assert_eq!(wrapped.specificity(), plain.specificity());
        assert_eq!(negated.specificity(), (1, 0, 1));
        assert!(Selector::parse("p:hover").is_none());
        assert!(Selector::parse(":not(ul > li)").is_none());
    }
}
