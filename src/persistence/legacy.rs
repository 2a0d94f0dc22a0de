//! Unversioned saves: one flat boolean per control state.

use serde_json::{Map, Value};

use crate::state::DockPosition;

use super::envelope::{FiltersEnvelope, SettingsEnvelope};

/// Shape of the last envelope that had no lock field.
const MIGRATED_VERSION: u32 = 4;

/// Truthiness of a loosely typed legacy flag.
fn truthy(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(false),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// First key in `levels` whose flag is set, highest level first.
fn highest<'a>(map: &Map<String, Value>, levels: &[(&str, &'a str)], fallback: &'a str) -> &'a str {
    levels
        .iter()
        .find(|(key, _)| truthy(map, key))
        .map(|(_, value)| *value)
        .unwrap_or(fallback)
}

/// Rebuilds a versioned envelope from a legacy payload. Anything that is not
/// a JSON object yields `None`.
pub fn migrate(legacy: &Value, default_position: DockPosition) -> Option<SettingsEnvelope> {
    let map = legacy.as_object()?;
    let position = DockPosition::parse(&text(map, "accPosition")).unwrap_or(default_position);

    Some(SettingsEnvelope {
        version: MIGRATED_VERSION,
        filters: FiltersEnvelope {
            invert: truthy(map, "invertColors"),
            grayscale: truthy(map, "grayscale"),
            saturation: highest(
                map,
                &[("highSaturation", "high"), ("lowSaturation", "low")],
                "default",
            )
            .to_string(),
            contrast: highest(
                map,
                &[
                    ("contrastStyle2", "extra"),
                    ("contrastStyle1", "high"),
                    ("contrastStyle0", "low"),
                ],
                "default",
            )
            .to_string(),
        },
        underline: highest(
            map,
            &[
                ("underlineStyle2", "style-2"),
                ("underlineStyle1", "style-1"),
                ("underlineStyle0", "style-0"),
            ],
            "default",
        )
        .to_string(),
        font_size: text(map, "fontSize"),
        line_height: highest(
            map,
            &[
                ("lineHeight2", "line-height-2"),
                ("lineHeight1", "line-height-1"),
                ("lineHeight0", "line-height-0"),
            ],
            "default",
        )
        .to_string(),
        letter_spacing: text(map, "letterSpacing"),
        text_align: text(map, "textAlign"),
        dyslexia_font: truthy(map, "dyslexiaFont"),
        hide_images: truthy(map, "hideImages"),
        hide_video: truthy(map, "hideVideo"),
        reduce_motion: Some(truthy(map, "reduceMotion")),
        reduce_motion_locked: None,
        cursor: highest(
            map,
            &[("cursor2", "guide"), ("cursor1", "mask"), ("cursor0", "focus")],
            "default",
        )
        .to_string(),
        position: Some(position.as_str().to_string()),
        language: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn highest_level_wins() {
        let legacy = json!({
            "contrastStyle0": true,
            "contrastStyle2": 1,
            "lowSaturation": "yes",
            "cursor1": true,
            "lineHeight0": true
        });
        let envelope = migrate(&legacy, DockPosition::default()).unwrap();
        assert_eq!(envelope.filters.contrast, "extra");
        assert_eq!(envelope.filters.saturation, "low");
        assert_eq!(envelope.cursor, "mask");
        assert_eq!(envelope.line_height, "line-height-0");
        assert_eq!(envelope.reduce_motion, Some(false));
    }

    #[test]
    fn non_objects_do_not_migrate() {
        assert!(migrate(&json!(null), DockPosition::default()).is_none());
        assert!(migrate(&json!([1, 2]), DockPosition::default()).is_none());
        assert!(migrate(&json!("invertColors"), DockPosition::default()).is_none());
    }

    #[test]
    fn falsy_flags_stay_off() {
        let legacy = json!({"invertColors": 0, "grayscale": "", "hideImages": null});
        let envelope = migrate(&legacy, DockPosition::Top).unwrap();
        assert!(!envelope.filters.invert);
        assert!(!envelope.filters.grayscale);
        assert!(!envelope.hide_images);
        assert_eq!(envelope.position.as_deref(), Some("top"));
    }
}
