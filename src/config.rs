//! Embed-time configuration.
//!
//! A page embeds the widget with a `<script data-*>` tag; the same options
//! can come from a YAML file. Both sources are folded into [`RawConfig`] and
//! validated once into a [`WidgetConfig`].

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::dom::{Document, NodeId};
use crate::state::{DockPosition, Language};

pub const DEFAULT_TAILWIND_STYLESHEET: &str = "accessibility-tailwind.css";
pub const DEFAULT_OPEN_DYSLEXIC_STYLESHEET: &str = "open-dyslexic.css";

/// Script file names the widget ships under.
const SCRIPT_NAME_HINT: &str = "accessibility-menu";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read widget config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Production,
    Debug,
}

impl Mode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" | "development" => Self::Debug,
            _ => Self::Production,
        }
    }
}

/// Theme colors exposed to the chrome as CSS variables. `None` means the
/// stylesheet derives the value from another color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeColors {
    pub button_active: String,
    pub button: String,
    pub button_hover: Option<String>,
    pub text: Option<String>,
    pub header_background: Option<String>,
    pub header_text: String,
    pub control_active: Option<String>,
    pub control_active_text: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            button_active: "#036cff".into(),
            button: "#f8fafc".into(),
            button_hover: None,
            text: None,
            header_background: None,
            header_text: "#ffffff".into(),
            control_active: None,
            control_active_text: "#ffffff".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailwindAsset {
    Link(String),
    Script(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub default_language: Language,
    pub fallback_language: Language,
    pub supported_languages: Vec<Language>,
    pub mode: Mode,
    pub colors: ThemeColors,
    pub default_position: DockPosition,
    pub locales_path: String,
    /// Empty, or ends in `/`.
    pub asset_base_path: String,
    pub open_dyslexic_stylesheet: String,
    pub inject_tailwind: bool,
    pub tailwind_stylesheet: String,
    pub tailwind_cdn_url: String,
    pub translate_language_names: bool,
    pub preserve_language_icons: bool,
    pub position_controls_enabled: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        RawConfig::default().validate()
    }
}

/// Loosely typed flag: YAML booleans or the strings embed attributes carry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    /// `None` for strings outside the recognised vocabulary.
    fn resolve(&self) -> Option<bool> {
        match self {
            Flag::Bool(flag) => Some(*flag),
            Flag::Text(text) => parse_flag(text),
        }
    }
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Options exactly as supplied, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Location of the embedding script; its directory becomes the asset
    /// base when no explicit one is given.
    pub script_src: Option<String>,
    #[serde(alias = "assets_path")]
    pub asset_base_path: Option<String>,
    pub default_language: Option<String>,
    pub fallback_language: Option<String>,
    pub supported_languages: Option<Vec<String>>,
    pub mode: Option<String>,
    pub color_button_active: Option<String>,
    pub color_button: Option<String>,
    pub color_button_hover: Option<String>,
    pub color_text: Option<String>,
    pub color_header_background: Option<String>,
    pub color_header_text: Option<String>,
    pub color_control_active: Option<String>,
    pub color_control_active_text: Option<String>,
    #[serde(alias = "position")]
    pub default_position: Option<String>,
    pub locales_path: Option<String>,
    pub open_dyslexic_stylesheet: Option<String>,
    #[serde(alias = "tailwind")]
    pub inject_tailwind: Option<Flag>,
    pub tailwind_stylesheet: Option<String>,
    #[serde(alias = "tailwind_cdn")]
    pub tailwind_cdn_url: Option<String>,
    pub translate_language_names: Option<Flag>,
    pub preserve_language_icons: Option<Flag>,
    #[serde(alias = "position_controls")]
    pub position_controls_enabled: Option<Flag>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl RawConfig {
    /// Builds from `dataset` style pairs (`defaultLanguage`, `tailwindCdn`,
    /// …). Blank values count as absent; unknown keys are ignored.
    pub fn from_dataset<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut raw = Self::default();
        let mut position_controls = None;
        let mut enable_position_controls = None;
        for (key, value) in entries {
            let Some(value) = non_empty(value) else {
                continue;
            };
            match key {
                "src" => raw.script_src = Some(value),
                "assetsPath" | "assetBasePath" => raw.asset_base_path = Some(value),
                "defaultLanguage" => raw.default_language = Some(value),
                "fallbackLanguage" => raw.fallback_language = Some(value),
                "supportedLanguages" => {
                    raw.supported_languages =
                        Some(value.split(',').map(|code| code.trim().to_string()).collect())
                }
                "mode" => raw.mode = Some(value),
                "colorButtonActive" => raw.color_button_active = Some(value),
                "colorButton" => raw.color_button = Some(value),
                "colorButtonHover" => raw.color_button_hover = Some(value),
                "colorText" => raw.color_text = Some(value),
                "colorHeaderBackground" => raw.color_header_background = Some(value),
                "colorHeaderText" => raw.color_header_text = Some(value),
                "colorControlActive" => raw.color_control_active = Some(value),
                "colorControlActiveText" => raw.color_control_active_text = Some(value),
                "defaultPosition" => raw.default_position = Some(value),
                "position" => {
                    raw.default_position.get_or_insert(value);
                }
                "localesPath" => raw.locales_path = Some(value),
                "openDyslexicStylesheet" => raw.open_dyslexic_stylesheet = Some(value),
                "tailwind" => raw.inject_tailwind = Some(Flag::Text(value)),
                "tailwindStylesheet" => raw.tailwind_stylesheet = Some(value),
                "tailwindCdn" => raw.tailwind_cdn_url = Some(value),
                "tailwindCdnUrl" => {
                    raw.tailwind_cdn_url.get_or_insert(value);
                }
                "translateLanguageNames" => raw.translate_language_names = Some(Flag::Text(value)),
                "preserveLanguageIcons" => raw.preserve_language_icons = Some(Flag::Text(value)),
                "positionControls" => position_controls = Some(value),
                "enablePositionControls" => enable_position_controls = Some(value),
                _ => {}
            }
        }
        raw.position_controls_enabled = position_controls
            .or(enable_position_controls)
            .map(Flag::Text);
        raw
    }

    /// Reads the `data-*` attributes and `src` of an embedding `<script>`.
    pub fn from_script(doc: &Document, script: NodeId) -> Self {
        let mut entries = doc.dataset_entries(script);
        if let Some(src) = doc.attribute(script, "src") {
            entries.push(("src".to_string(), src.to_string()));
        }
        Self::from_dataset(entries.iter().map(|(key, value)| (key.as_str(), value.as_str())))
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn validate(self) -> WidgetConfig {
        let defaults = ThemeColors::default();

        let supported: Vec<Language> = self
            .supported_languages
            .as_deref()
            .map(|codes| {
                let mut languages = Vec::new();
                for language in codes.iter().filter_map(|code| Language::from_code(code)) {
                    if !languages.contains(&language) {
                        languages.push(language);
                    }
                }
                languages
            })
            .filter(|languages| !languages.is_empty())
            .unwrap_or_else(|| Language::ALL.to_vec());

        let pick = |code: Option<&str>, fallback: Language| {
            code.and_then(Language::from_code)
                .filter(|language| supported.contains(language))
                .unwrap_or(fallback)
        };
        let first = supported.first().copied().unwrap_or_default();
        let fallback_language = pick(
            self.fallback_language.as_deref(),
            if supported.contains(&Language::En) { Language::En } else { first },
        );
        let default_language = pick(self.default_language.as_deref(), fallback_language);

        let asset_base_path = self
            .asset_base_path
            .as_deref()
            .and_then(non_empty)
            .or_else(|| self.script_src.as_deref().and_then(script_directory))
            .map(|path| if path.ends_with('/') { path } else { format!("{path}/") })
            .unwrap_or_default();

        WidgetConfig {
            default_language,
            fallback_language,
            supported_languages: supported.clone(),
            mode: self.mode.as_deref().map(Mode::parse).unwrap_or_default(),
            colors: ThemeColors {
                button_active: required_color(self.color_button_active, defaults.button_active),
                button: required_color(self.color_button, defaults.button),
                button_hover: optional_color(self.color_button_hover),
                text: optional_color(self.color_text),
                header_background: optional_color(self.color_header_background),
                header_text: required_color(self.color_header_text, defaults.header_text),
                control_active: optional_color(self.color_control_active),
                control_active_text: required_color(
                    self.color_control_active_text,
                    defaults.control_active_text,
                ),
            },
            default_position: self
                .default_position
                .as_deref()
                .and_then(DockPosition::parse)
                .unwrap_or_default(),
            locales_path: self.locales_path.as_deref().and_then(non_empty).unwrap_or_default(),
            asset_base_path,
            open_dyslexic_stylesheet: self
                .open_dyslexic_stylesheet
                .as_deref()
                .and_then(non_empty)
                .unwrap_or_default(),
            inject_tailwind: self.inject_tailwind.as_ref().and_then(Flag::resolve).unwrap_or(true),
            tailwind_stylesheet: self
                .tailwind_stylesheet
                .as_deref()
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_TAILWIND_STYLESHEET.to_string()),
            tailwind_cdn_url: self
                .tailwind_cdn_url
                .as_deref()
                .and_then(non_empty)
                .unwrap_or_default(),
            translate_language_names: self
                .translate_language_names
                .as_ref()
                .and_then(Flag::resolve)
                .unwrap_or(false),
            preserve_language_icons: self
                .preserve_language_icons
                .as_ref()
                .and_then(Flag::resolve)
                .unwrap_or(false),
            position_controls_enabled: self
                .position_controls_enabled
                .as_ref()
                .and_then(Flag::resolve)
                .unwrap_or(false),
        }
    }
}

impl WidgetConfig {
    /// Reads a YAML file when `path` exists, else returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Ok(RawConfig::from_yaml(&contents)?.validate())
            }
            _ => Ok(Self::default()),
        }
    }

    /// Validated configuration of the widget script embedded in `doc`, if
    /// one is present.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let script = find_embed_script(doc)?;
        Some(RawConfig::from_script(doc, script).validate())
    }

    pub fn is_debug(&self) -> bool {
        self.mode == Mode::Debug
    }

    pub fn open_dyslexic_href(&self) -> String {
        if !self.open_dyslexic_stylesheet.is_empty() {
            return self.open_dyslexic_stylesheet.clone();
        }
        format!("{}{}", self.asset_base_path, DEFAULT_OPEN_DYSLEXIC_STYLESHEET)
    }

    /// Absolute and root-relative stylesheets are used as given; relative
    /// ones resolve against the asset base. Without a stylesheet the CDN URL
    /// loads as a link when it names a `.css` file and as a script otherwise.
    pub fn tailwind_asset(&self) -> Option<TailwindAsset> {
        if !self.inject_tailwind {
            return None;
        }
        let stylesheet = self.tailwind_stylesheet.trim();
        if !stylesheet.is_empty() {
            if is_absolute_reference(stylesheet) {
                return Some(TailwindAsset::Link(stylesheet.to_string()));
            }
            return Some(TailwindAsset::Link(format!("{}{stylesheet}", self.asset_base_path)));
        }
        let cdn = self.tailwind_cdn_url.trim();
        if cdn.is_empty() {
            return None;
        }
        if names_stylesheet(cdn) {
            Some(TailwindAsset::Link(cdn.to_string()))
        } else {
            Some(TailwindAsset::Script(cdn.to_string()))
        }
    }
}

/// `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}

fn optional_color(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .and_then(non_empty)
        .filter(|color| is_hex_color(color))
}

fn required_color(value: Option<String>, fallback: String) -> String {
    optional_color(value).unwrap_or(fallback)
}

/// Directory part of a script URL, query and fragment stripped.
fn script_directory(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let slash = path.rfind('/')?;
    Some(path[..=slash].to_string())
}

fn is_absolute_reference(reference: &str) -> bool {
    if reference.starts_with('/') {
        return true;
    }
    let Some((scheme, rest)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '.' | '-'));
    valid_scheme && rest.starts_with("//")
}

fn names_stylesheet(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.to_ascii_lowercase().ends_with(".css")
}

fn find_embed_script(doc: &Document) -> Option<NodeId> {
    doc.elements_by_tag(doc.root(), "script")
        .into_iter()
        .rev()
        .find(|script| {
            doc.attribute(*script, "src")
                .map(|src| {
                    let path = src.split(['?', '#']).next().unwrap_or_default();
                    path.rsplit('/').next().unwrap_or_default().contains(SCRIPT_NAME_HINT)
                })
                .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_embed_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.default_language, Language::En);
        assert_eq!(config.default_position, DockPosition::BottomLeft);
        assert!(config.inject_tailwind);
        assert!(!config.position_controls_enabled);
        assert_eq!(config.colors.button_active, "#036cff");
        assert_eq!(config.open_dyslexic_href(), "open-dyslexic.css");
        assert_eq!(config.supported_languages.len(), 6);
    }

    #[test]
    fn dataset_values_are_normalised() {
        let raw = RawConfig::from_dataset([
            ("defaultLanguage", " FR "),
            ("position", "align-a11y-stiac-top"),
            ("assetsPath", "https://cdn.example/widget"),
            ("colorButton", "blue"),
            ("colorHeaderText", "#abc"),
            ("positionControls", "yes"),
            ("tailwind", "maybe"),
            ("translateLanguageNames", "0"),
        ]);
        let config = raw.validate();
        assert_eq!(config.default_language, Language::Fr);
        assert_eq!(config.default_position, DockPosition::Top);
        assert_eq!(config.asset_base_path, "https://cdn.example/widget/");
        assert_eq!(config.colors.button, "#f8fafc");
        assert_eq!(config.colors.header_text, "#abc");
        assert!(config.position_controls_enabled);
        assert!(config.inject_tailwind);
        assert!(!config.translate_language_names);
        assert_eq!(
            config.open_dyslexic_href(),
            "https://cdn.example/widget/open-dyslexic.css"
        );
    }

    #[test]
    fn script_src_provides_asset_base() {
        let doc = Document::parse_html(
            "<script src=\"https://cdn.example/a11y/accessibility-menu.js?v=3\" data-default-position=\"right\" \
             data-tailwind-stylesheet=\"//cdn.example/tw.css\"></script>",
        );
        let config = WidgetConfig::from_document(&doc).unwrap();
        assert_eq!(config.asset_base_path, "https://cdn.example/a11y/");
        assert_eq!(config.default_position, DockPosition::Right);
        assert_eq!(
            config.tailwind_asset(),
            Some(TailwindAsset::Link("//cdn.example/tw.css".into()))
        );
    }

    #[test]
    fn tailwind_resolution() {
        let mut config = WidgetConfig {
            asset_base_path: "/static/".into(),
            ..WidgetConfig::default()
        };
        assert_eq!(
            config.tailwind_asset(),
            Some(TailwindAsset::Link("/static/accessibility-tailwind.css".into()))
        );
        config.tailwind_stylesheet.clear();
        config.tailwind_cdn_url = "https://cdn.tailwindcss.com".into();
        assert_eq!(
            config.tailwind_asset(),
            Some(TailwindAsset::Script("https://cdn.tailwindcss.com".into()))
        );
        config.tailwind_cdn_url = "https://cdn.example/tailwind.min.css?x=1".into();
        assert!(matches!(config.tailwind_asset(), Some(TailwindAsset::Link(_))));
        config.inject_tailwind = false;
        assert_eq!(config.tailwind_asset(), None);
    }

    #[test]
    fn languages_outside_supported_fall_back() {
        let config = RawConfig {
            supported_languages: Some(vec!["IT".into(), "de".into(), "xx".into()]),
            default_language: Some("fr".into()),
            ..RawConfig::default()
        }
        .validate();
        assert_eq!(config.supported_languages, vec![Language::It, Language::De]);
        assert_eq!(config.fallback_language, Language::It);
        assert_eq!(config.default_language, Language::It);
    }

    #[test]
    fn loads_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(
            file,
            "default_language: de\nposition_controls_enabled: true\ntailwind: \"off\"\nmode: debug\ncolor_text: \"#112233\""
        )
        .unwrap();
        let config = WidgetConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.default_language, Language::De);
        assert!(config.position_controls_enabled);
        assert!(!config.inject_tailwind);
        assert!(config.is_debug());
        assert_eq!(config.colors.text.as_deref(), Some("#112233"));
    }
}
