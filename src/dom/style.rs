//! Declaration blocks, shared by inline `style` attributes and author rules.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// Parsed `style` attribute. The attribute stays the source of truth; this is
/// rebuilt on every access and written back on every edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<Declaration>,
}

impl InlineStyle {
    pub fn parse(text: &str) -> Self {
        Self {
            declarations: parse_declarations(text),
        }
    }

    pub fn get(&self, property: &str) -> Option<&Declaration> {
        let property = property.trim().to_ascii_lowercase();
        self.declarations
            .iter()
            .rev()
            .find(|declaration| declaration.property == property)
    }

    pub fn value(&self, property: &str) -> Option<&str> {
        self.get(property).map(|declaration| declaration.value.as_str())
    }

    /// Replaces in place when the property already exists, so serialised
    /// order survives a set/restore pair.
    pub fn set(&mut self, property: &str, value: &str, important: bool) {
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        if let Some(existing) = self
            .declarations
            .iter_mut()
            .find(|declaration| declaration.property == property)
        {
            existing.value = value;
            existing.important = important;
            return;
        }
        self.declarations.push(Declaration {
            property,
            value,
            important,
        });
    }

    pub fn remove(&mut self, property: &str) -> Option<Declaration> {
        let property = property.trim().to_ascii_lowercase();
        let position = self
            .declarations
            .iter()
            .position(|declaration| declaration.property == property)?;
        let removed = self.declarations.remove(position);
        self.declarations
            .retain(|declaration| declaration.property != property);
        Some(removed)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn to_css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|declaration| {
                if declaration.important {
                    format!("{}: {} !important;", declaration.property, declaration.value)
                } else {
                    format!("{}: {};", declaration.property, declaration.value)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Splits `a: b; c: d !important` into declarations. Semicolons inside
/// parentheses or quotes (data URLs) do not end a declaration.
pub(crate) fn parse_declarations(block: &str) -> Vec<Declaration> {
    split_top_level(block, ';')
        .into_iter()
        .filter_map(|chunk| {
            let (property, value) = chunk.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            if property.is_empty() {
                return None;
            }
            let mut value = value.trim().to_string();
            let important = strip_important(&mut value);
            if value.is_empty() {
                return None;
            }
            Some(Declaration {
                property,
                value,
                important,
            })
        })
        .collect()
}

fn strip_important(value: &mut String) -> bool {
    let lowered = value.to_ascii_lowercase();
    let Some(bang) = lowered.rfind('!') else {
        return false;
    };
    if lowered[bang + 1..].trim() != "important" {
        return false;
    }
    value.truncate(bang);
    let trimmed = value.trim_end().len();
    value.truncate(trimmed);
    true
}

pub(crate) fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(&input[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// `"16px"` → `16.0`. Anything else is `None`.
pub fn parse_px(value: &str) -> Option<f64> {
    let number = value.trim().strip_suffix("px")?.trim();
    let parsed = number.parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Formats a pixel length the way computed styles report it: at most three
/// decimals, no trailing zeros.
pub fn format_px(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let mut text = format!("{rounded:.3}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    if text == "-0" {
        text = "0".to_string();
    }
    format!("{text}px")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_priority_and_keeps_order() {
        let style = InlineStyle::parse("color: red; background-image:url(a.png) !IMPORTANT ;");
        assert_eq!(style.value("background-image"), Some("url(a.png)"));
        assert!(style.get("background-image").unwrap().important);
        assert_eq!(
            style.to_css_text(),
            "color: red; background-image: url(a.png) !important;"
        );
    }

    #[test]
    fn data_urls_survive_semicolons() {
        let style = InlineStyle::parse("background: url(\"data:image/png;base64,AAA\") no-repeat");
        assert_eq!(
            style.value("background"),
            Some("url(\"data:image/png;base64,AAA\") no-repeat")
        );
    }

    #[test]
    fn set_replaces_in_place() {
        let mut style = InlineStyle::parse("a: 1; b: 2;");
        style.set("a", "3", true);
        assert_eq!(style.to_css_text(), "a: 3 !important; b: 2;");
        assert!(style.remove("a").is_some());
        assert_eq!(style.to_css_text(), "b: 2;");
    }

    #[test]
    fn formats_pixels_like_computed_style() {
        assert_eq!(format_px(16.0 * 1.3), "20.8px");
        assert_eq!(format_px(16.0 * 1.5), "24px");
        assert_eq!(format_px(16.0 * 1.8), "28.8px");
        assert_eq!(parse_px(" 12.5px "), Some(12.5));
        assert_eq!(parse_px("1em"), None);
    }
}
