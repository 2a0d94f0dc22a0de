use serde_json::{Map, Value};

pub type MessageParams = Map<String, Value>;

/// Replaces `{{ token }}` placeholders with the matching parameter. Unknown
/// tokens render as nothing.
pub fn format_template(template: &str, params: &MessageParams) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        let token = after_open[..close].trim();
        if token.is_empty() {
            out.push_str(&rest[..open + 2 + close + 2]);
            rest = &after_open[close + 2..];
            continue;
        }
        out.push_str(&rest[..open]);
        if let Some(value) = params.get(token) {
            out.push_str(&param_text(value));
        }
        rest = &after_open[close + 2..];
    }
    out.push_str(rest);
    out
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Dotted-path lookup, `controls.fontSize.label`.
pub fn lookup<'a>(translations: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return None;
    }
    key.split('.')
        .try_fold(translations, |node, segment| node.as_object()?.get(segment))
}

/// Strings are templates. Objects are plural forms chosen by a numeric
/// `count` parameter (`one` for exactly 1, otherwise `other`), with `default`
/// as the last resort.
pub fn format_value(raw: &Value, params: &MessageParams) -> Option<String> {
    match raw {
        Value::String(template) => Some(format_template(template, params)),
        Value::Object(forms) => {
            let count = params.get("count").and_then(Value::as_f64);
            let plural = count.and_then(|count| {
                let form = if count == 1.0 { "one" } else { "other" };
                forms.get(form).or_else(|| forms.get("other"))
            });
            plural
                .or_else(|| forms.get("default"))
                .and_then(Value::as_str)
                .map(|template| format_template(template, params))
        }
        _ => None,
    }
}

pub fn resolve_message(translations: &Value, key: &str, params: &MessageParams) -> Option<String> {
    lookup(translations, key).and_then(|raw| format_value(raw, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> MessageParams {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn templates_fill_known_tokens() {
        let p = params(json!({"language": "Deutsch", "n": 3}));
        assert_eq!(
            format_template("Sprache auf {{language}} geändert.", &p),
            "Sprache auf Deutsch geändert."
        );
        assert_eq!(format_template("{{ n }} items, {{missing}}!", &p), "3 items, !");
        assert_eq!(format_template("open {{ never", &p), "open {{ never");
    }

    #[test]
    fn plural_forms_follow_count() {
        let translations = json!({
            "items": {"one": "{{count}} item", "other": "{{count}} items", "default": "items"}
        });
        assert_eq!(
            resolve_message(&translations, "items", &params(json!({"count": 1}))).as_deref(),
            Some("1 item")
        );
        assert_eq!(
            resolve_message(&translations, "items", &params(json!({"count": 4}))).as_deref(),
            Some("4 items")
        );
        assert_eq!(
            resolve_message(&translations, "items", &MessageParams::new()).as_deref(),
            Some("items")
        );
    }

    #[test]
    fn dotted_lookup_misses_cleanly() {
        let translations = json!({"controls": {"fontSize": {"label": "Font Size"}}});
        let params = MessageParams::new();
        assert_eq!(
            resolve_message(&translations, "controls.fontSize.label", &params).as_deref(),
            Some("Font Size")
        );
        assert_eq!(resolve_message(&translations, "controls.fontSize", &params), None);
        assert_eq!(resolve_message(&translations, "controls.nope.label", &params), None);
    }
}
