use serde::{Deserialize, Serialize};

use crate::state::{
    ColorFilters, Contrast, CursorStyle, DockPosition, FontScale, Language, LetterSpacing,
    LineHeight, LinkStyle, MotionPreference, PreferenceState, Saturation, TextAlign,
};

pub const CURRENT_VERSION: u32 = 5;

/// Root font size `px` values are measured against.
const ROOT_FONT_SIZE_PX: f64 = 16.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FiltersEnvelope {
    pub invert: bool,
    pub grayscale: bool,
    pub saturation: String,
    pub contrast: String,
}

impl Default for FiltersEnvelope {
    fn default() -> Self {
        Self {
            invert: false,
            grayscale: false,
            saturation: Saturation::Default.as_str().to_string(),
            contrast: Contrast::Default.as_str().to_string(),
        }
    }
}

/// The JSON document stored under the settings key.
///
/// Every field is optional on read; `reduceMotion` and `reduceMotionLocked`
/// stay `Option` because their absence changes how the lock is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsEnvelope {
    pub version: u32,
    pub filters: FiltersEnvelope,
    pub underline: String,
    pub font_size: String,
    pub line_height: String,
    pub letter_spacing: String,
    pub text_align: String,
    pub dyslexia_font: bool,
    pub hide_images: bool,
    pub hide_video: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_motion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_motion_locked: Option<bool>,
    pub cursor: String,
    /// Absent means the configured default dock, not a fixed corner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Default for SettingsEnvelope {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            filters: FiltersEnvelope::default(),
            underline: LinkStyle::Default.as_str().to_string(),
            font_size: String::new(),
            line_height: LineHeight::Default.as_str().to_string(),
            letter_spacing: String::new(),
            text_align: String::new(),
            dyslexia_font: false,
            hide_images: false,
            hide_video: false,
            reduce_motion: None,
            reduce_motion_locked: None,
            cursor: CursorStyle::Default.as_str().to_string(),
            position: None,
            language: None,
        }
    }
}

impl SettingsEnvelope {
    pub fn from_state(state: &PreferenceState) -> Self {
        let filters = &state.color_filters;
        Self {
            version: CURRENT_VERSION,
            filters: FiltersEnvelope {
                invert: filters.invert,
                grayscale: filters.grayscale,
                saturation: filters.saturation.as_str().to_string(),
                contrast: filters.contrast.as_str().to_string(),
            },
            underline: state.link_style.as_str().to_string(),
            font_size: font_size_value(state.font_scale),
            line_height: state.line_height.as_str().to_string(),
            letter_spacing: state.letter_spacing.css_value().to_string(),
            text_align: state.text_align.as_str().to_string(),
            dyslexia_font: state.dyslexia_font,
            hide_images: state.hide_images,
            hide_video: state.hide_video,
            reduce_motion: Some(state.reduce_motion.effective()),
            reduce_motion_locked: Some(state.reduce_motion.locked()),
            cursor: state.cursor_style.as_str().to_string(),
            position: Some(state.dock_position.as_str().to_string()),
            language: Some(state.language.code().to_string()),
        }
    }

    /// Normalises every field into a [`PreferenceState`]. Unknown strings
    /// fall back to the field's default.
    pub fn into_state(self, default_position: DockPosition) -> PreferenceState {
        // Envelopes written before the lock was stored locked whenever they
        // carried a reduce-motion value at all.
        let locked = self
            .reduce_motion_locked
            .unwrap_or(self.reduce_motion.is_some());
        let reduce_motion = MotionPreference {
            user: locked.then(|| self.reduce_motion.unwrap_or(false)),
            system: false,
        };

        PreferenceState {
            color_filters: ColorFilters {
                invert: self.filters.invert,
                grayscale: self.filters.grayscale,
                saturation: Saturation::parse(&self.filters.saturation),
                contrast: Contrast::parse(&self.filters.contrast),
            },
            link_style: LinkStyle::parse(&self.underline),
            font_scale: resolve_font_scale(&self.font_size)
                .map(FontScale::new)
                .unwrap_or(FontScale::UNSET),
            line_height: LineHeight::parse(&self.line_height),
            letter_spacing: LetterSpacing::parse(&self.letter_spacing),
            text_align: TextAlign::parse(&self.text_align),
            dyslexia_font: self.dyslexia_font,
            hide_images: self.hide_images,
            hide_video: self.hide_video,
            reduce_motion,
            cursor_style: CursorStyle::parse(&self.cursor),
            dock_position: self
                .position
                .as_deref()
                .and_then(DockPosition::parse)
                .unwrap_or(default_position),
            language: self
                .language
                .as_deref()
                .and_then(Language::from_code)
                .unwrap_or_default(),
        }
    }
}

/// Percent form of a scale, `1.3` → `"130%"`.
pub fn font_size_value(scale: FontScale) -> String {
    match scale.factor() {
        Some(factor) => {
            let percent = (factor * 100.0 * 1000.0).round() / 1000.0;
            format!("{percent}%")
        }
        None => String::new(),
    }
}

/// Reads a stored font size as a multiplier.
///
/// `%` divides by 100, `em`/`rem` are taken as is, `px` is relative to a
/// 16px root, and bare numbers above 10 are read as percentages.
pub fn resolve_font_scale(value: &str) -> Option<f64> {
    let normalised = value.trim().to_ascii_lowercase();
    if normalised.is_empty() {
        return None;
    }
    let scale = if let Some(number) = normalised.strip_suffix('%') {
        leading_number(number)? / 100.0
    } else if let Some(number) = normalised
        .strip_suffix("rem")
        .or_else(|| normalised.strip_suffix("em"))
    {
        leading_number(number)?
    } else if let Some(number) = normalised.strip_suffix("px") {
        leading_number(number)? / ROOT_FONT_SIZE_PX
    } else {
        let plain = leading_number(&normalised)?;
        if plain > 10.0 {
            plain / 100.0
        } else {
            plain
        }
    };
    (scale.is_finite() && scale > 0.0).then_some(scale)
}

fn leading_number(value: &str) -> Option<f64> {
    let number = value.trim().parse::<f64>().ok()?;
    (number.is_finite() && number > 0.0).then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_scale_units() {
        assert_eq!(resolve_font_scale("130%"), Some(1.3));
        assert_eq!(resolve_font_scale("1.5rem"), Some(1.5));
        assert_eq!(resolve_font_scale("1.8em"), Some(1.8));
        assert_eq!(resolve_font_scale("24px"), Some(1.5));
        assert_eq!(resolve_font_scale("150"), Some(1.5));
        assert_eq!(resolve_font_scale("1.2"), Some(1.2));
        assert_eq!(resolve_font_scale("0%"), None);
        assert_eq!(resolve_font_scale("big"), None);
        assert_eq!(resolve_font_scale(""), None);
    }

    #[test]
    fn percent_form_is_exact() {
        assert_eq!(font_size_value(FontScale::LARGE), "130%");
        assert_eq!(font_size_value(FontScale::LARGEST), "180%");
        assert_eq!(font_size_value(FontScale::new(1.25)), "125%");
        assert_eq!(font_size_value(FontScale::UNSET), "");
    }

    #[test]
    fn unknown_vocabulary_normalises() {
        let envelope = SettingsEnvelope {
            underline: "style-9".into(),
            cursor: "sparkles".into(),
            position: Some("middle".into()),
            language: Some("nl".into()),
            ..SettingsEnvelope::default()
        };
        let state = envelope.into_state(DockPosition::Right);
        assert_eq!(state.link_style, LinkStyle::Default);
        assert_eq!(state.cursor_style, CursorStyle::Default);
        assert_eq!(state.dock_position, DockPosition::Right);
        assert_eq!(state.language, Language::En);
    }

    #[test]
    fn missing_position_uses_configured_dock() {
        let state = SettingsEnvelope::default().into_state(DockPosition::BottomRight);
        assert_eq!(state.dock_position, DockPosition::BottomRight);
    }

    #[test]
    fn lock_follows_stored_flag() {
        let unlocked = SettingsEnvelope {
            reduce_motion: Some(false),
            reduce_motion_locked: Some(false),
            ..SettingsEnvelope::default()
        };
        assert_eq!(unlocked.into_state(DockPosition::default()).reduce_motion.user, None);

        let older = SettingsEnvelope {
            version: 4,
            reduce_motion: Some(false),
            ..SettingsEnvelope::default()
        };
        assert_eq!(older.into_state(DockPosition::default()).reduce_motion.user, Some(false));
    }
}
