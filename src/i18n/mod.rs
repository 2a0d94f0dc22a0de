//! Interface language: locale loading, element translation, and the
//! `<html lang>` / live region side effects of switching.

mod format;
mod source;

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::dom::{DomError, Document, NodeId};
use crate::engine::markers;
use crate::state::Language;
use crate::storage::KeyValueStore;

pub use format::{format_template, format_value, lookup, resolve_message, MessageParams};
pub use source::LocaleSource;

pub const LANGUAGE_STORAGE_KEY: &str = "stiacAccessibilityLanguage";
/// Created under `<body>` when no live region is configured or found.
pub const FALLBACK_LIVE_REGION_ID: &str = "stiac-accessibility-i18n-live";

const DEFAULT_ANNOUNCEMENT: &str = "Language changed to {{language}}.";

#[derive(Debug, Error)]
pub enum I18nError {
    #[error("failed to read locale: {0}")]
    Io(#[from] std::io::Error),
    #[error("locale request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid locale URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("locale is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("locale request to {url} returned {status}")]
    Status { url: String, status: u16 },
}

pub fn native_name(language: Language) -> &'static str {
    match language {
        Language::En => "English",
        Language::It => "Italiano",
        Language::Fr => "Français",
        Language::De => "Deutsch",
        Language::Es => "Español",
        Language::Pt => "Português",
    }
}

/// Handed to listeners each time a language is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageApplied {
    pub language: Language,
    pub translations: Value,
}

pub type LanguageListener = Box<dyn FnMut(&LanguageApplied)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct I18nConfig {
    pub default_language: Option<String>,
    pub fallback_language: Option<String>,
    /// Empty means every [`Language`].
    pub supported_languages: Vec<String>,
    pub initial_language: Option<String>,
    /// What a browser would report as `navigator.languages`.
    pub preferred_languages: Vec<String>,
    /// Scope translated on every switch; the whole document when `None`.
    pub root: Option<NodeId>,
    /// Id of the element to announce switches in.
    pub live_region: Option<String>,
    pub on_language_applied: Option<LanguageListener>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetLanguageOptions {
    pub root: Option<NodeId>,
    pub announce: bool,
    pub notify: bool,
}

impl Default for SetLanguageOptions {
    fn default() -> Self {
        Self {
            root: None,
            announce: true,
            notify: true,
        }
    }
}

pub struct I18n {
    source: LocaleSource,
    cache: HashMap<Language, Option<Value>>,
    supported: Vec<Language>,
    fallback: Language,
    current: Option<Language>,
    translations: Value,
    fallback_translations: Value,
    root: Option<NodeId>,
    live_region: Option<String>,
    listeners: Vec<(SubscriptionId, LanguageListener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for I18n {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18n")
            .field("current", &self.current)
            .field("fallback", &self.fallback)
            .field("supported", &self.supported)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl I18n {
    /// Picks the first supported language among the explicit initial one,
    /// the stored choice, the configured default, the preferred list and
    /// the fallback, then applies it without announcing.
    pub async fn init(
        config: I18nConfig,
        source: LocaleSource,
        doc: &mut Document,
        store: &dyn KeyValueStore,
    ) -> Self {
        let mut supported = Vec::new();
        for language in config
            .supported_languages
            .iter()
            .filter_map(|code| Language::from_code(code))
        {
            if !supported.contains(&language) {
                supported.push(language);
            }
        }
        if supported.is_empty() {
            supported = Language::ALL.to_vec();
        }
        let fallback = config
            .fallback_language
            .as_deref()
            .and_then(Language::from_code)
            .filter(|language| supported.contains(language))
            .unwrap_or_default();

        let mut i18n = Self {
            source,
            cache: HashMap::new(),
            supported,
            fallback,
            current: None,
            translations: Value::Object(Default::default()),
            fallback_translations: Value::Object(Default::default()),
            root: config.root,
            live_region: config.live_region,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        if let Some(listener) = config.on_language_applied {
            i18n.subscribe(listener);
        }

        let stored = match store.get(LANGUAGE_STORAGE_KEY) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::debug!(target: "a11y::i18n", error = %err, "stored language unavailable");
                None
            }
        };
        let candidates = config
            .initial_language
            .iter()
            .chain(stored.iter())
            .chain(config.default_language.iter())
            .chain(config.preferred_languages.iter());
        let initial = candidates
            .filter_map(|code| i18n.normalise(code))
            .next()
            .unwrap_or(i18n.fallback);

        let options = SetLanguageOptions {
            root: i18n.root,
            announce: false,
            notify: true,
        };
        i18n.apply_language(doc, store, initial, options).await;
        i18n
    }

    /// Lowercased exact match, else a supported base tag of `xx-YY`.
    pub fn normalise(&self, code: &str) -> Option<Language> {
        Language::from_code(code).filter(|language| self.supported.contains(language))
    }

    pub fn current_language(&self) -> Language {
        self.current.unwrap_or(self.fallback)
    }

    pub fn fallback_language(&self) -> Language {
        self.fallback
    }

    pub fn supported_languages(&self) -> &[Language] {
        &self.supported
    }

    pub fn translations(&self) -> &Value {
        &self.translations
    }

    pub fn subscribe(&mut self, listener: LanguageListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(existing, _)| *existing != id);
    }

    /// Switches to `requested`, or the fallback when it is unsupported or
    /// its locale cannot be loaded.
    pub async fn set_language(
        &mut self,
        doc: &mut Document,
        store: &dyn KeyValueStore,
        requested: &str,
        options: SetLanguageOptions,
    ) -> LanguageApplied {
        let target = self.normalise(requested).unwrap_or(self.fallback);
        self.apply_language(doc, store, target, options).await
    }

    async fn apply_language(
        &mut self,
        doc: &mut Document,
        store: &dyn KeyValueStore,
        target: Language,
        options: SetLanguageOptions,
    ) -> LanguageApplied {
        if options.root.is_some() {
            self.root = options.root;
        }

        let fallback = self.load(self.fallback).await;
        let (active, translations) = match self.load(target).await {
            Some(translations) => (target, translations),
            None => (self.fallback, fallback.clone().unwrap_or_else(empty_object)),
        };
        self.current = Some(active);
        self.translations = translations;
        self.fallback_translations = fallback.unwrap_or_else(empty_object);

        let scope = options.root.or(self.root).unwrap_or_else(|| doc.root());
        self.apply_translations(doc, scope);
        if let Some(html) = doc.document_element() {
            if let Err(err) = doc.set_attribute(html, "lang", active.code()) {
                tracing::debug!(target: "a11y::i18n", error = %err, "unable to set document language");
            }
        }
        if let Err(err) = store.set(LANGUAGE_STORAGE_KEY, active.code()) {
            tracing::debug!(target: "a11y::i18n", error = %err, "unable to persist language");
        }
        tracing::info!(target: "a11y::i18n", language = active.code(), "language applied");

        let payload = LanguageApplied {
            language: active,
            translations: self.translations.clone(),
        };
        if options.notify {
            for (_, listener) in &mut self.listeners {
                listener(&payload);
            }
        }
        if options.announce {
            self.announce(doc, active);
        }
        payload
    }

    /// Cached per language, failures included, so a missing locale is only
    /// requested once.
    async fn load(&mut self, language: Language) -> Option<Value> {
        if let Some(cached) = self.cache.get(&language) {
            return cached.clone();
        }
        let loaded = match self.source.fetch(language).await {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(target: "a11y::i18n", language = language.code(), error = %err, "unable to load locale");
                None
            }
        };
        self.cache.insert(language, loaded.clone());
        loaded
    }

    /// Message for `key` in the active language, else the fallback.
    pub fn resolve(&self, key: &str, params: &MessageParams) -> Option<String> {
        resolve_message(&self.translations, key, params)
            .or_else(|| resolve_message(&self.fallback_translations, key, params))
    }

    /// Rewrites `data-i18n` text and `data-i18n-attr` attributes below
    /// `scope`. Keys that resolve nowhere leave the element as it was.
    pub fn apply_translations(&self, doc: &mut Document, scope: NodeId) {
        let targets: Vec<NodeId> = doc
            .subtree(scope)
            .into_iter()
            .filter(|node| *node != scope)
            .filter(|node| doc.has_attribute(*node, "data-i18n") || doc.has_attribute(*node, "data-i18n-attr"))
            .collect();

        for node in targets {
            let params = element_params(doc, node);
            if let Err(err) = self.translate_element(doc, node, &params) {
                tracing::debug!(target: "a11y::i18n", %node, error = %err, "skipping element");
            }
        }
    }

    fn translate_element(
        &self,
        doc: &mut Document,
        node: NodeId,
        params: &MessageParams,
    ) -> Result<(), DomError> {
        if let Some(key) = doc.attribute(node, "data-i18n").map(str::to_string) {
            if let Some(message) = self.resolve(key.trim(), params) {
                doc.set_text_content(node, &message)?;
            }
        }
        let Some(mapping) = doc.attribute(node, "data-i18n-attr").map(str::to_string) else {
            return Ok(());
        };
        for entry in mapping.split(',') {
            let Some((attribute, key)) = entry.split_once(':') else {
                continue;
            };
            let (attribute, key) = (attribute.trim(), key.trim());
            if attribute.is_empty() || key.is_empty() {
                continue;
            }
            if let Some(message) = self.resolve(key, params) {
                doc.set_attribute(node, attribute, &message)?;
            }
        }
        Ok(())
    }

    /// Name shown for `language`: the translated name when asked for and
    /// available, else the native one.
    pub fn language_name(&self, language: Language, translated: bool) -> String {
        if translated {
            let key = format!("languageNames.{}", language.code());
            if let Some(name) = lookup(&self.translations, &key).and_then(Value::as_str) {
                return name.to_string();
            }
        }
        native_name(language).to_string()
    }

    fn announce(&self, doc: &mut Document, language: Language) {
        let Some(region) = self.live_region_node(doc) else {
            return;
        };
        let name = lookup(&self.translations, &format!("languageNames.{}", language.code()))
            .and_then(Value::as_str)
            .unwrap_or(language.code())
            .to_string();
        let template = lookup(&self.translations, "language.announcement")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ANNOUNCEMENT);
        let mut params = MessageParams::new();
        params.insert("language".into(), Value::String(name));
        let text = format_template(template, &params);
        if let Err(err) = doc.set_text_content(region, &text) {
            tracing::debug!(target: "a11y::i18n", error = %err, "unable to announce language");
        }
    }

    fn live_region_node(&self, doc: &mut Document) -> Option<NodeId> {
        let configured = self
            .live_region
            .as_deref()
            .and_then(|id| doc.element_by_id(id))
            .filter(|node| doc.is_connected(*node));
        if configured.is_some() {
            return configured;
        }
        if let Some(existing) = doc.element_by_id(FALLBACK_LIVE_REGION_ID) {
            return Some(existing);
        }
        let body = doc.body()?;
        let region = doc.create_element("div");
        let build = |doc: &mut Document| -> Result<(), DomError> {
            doc.set_attribute(region, "id", FALLBACK_LIVE_REGION_ID)?;
            doc.set_attribute(region, "aria-live", "polite")?;
            doc.set_attribute(region, "role", "status")?;
            doc.set_attribute(region, markers::WIDGET_OWNED, "")?;
            doc.set_attribute(
                region,
                "style",
                "position: absolute; width: 1px; height: 1px; margin: -1px; border: 0; padding: 0; \
                 clip: rect(0 0 0 0); clip-path: inset(50%); overflow: hidden; white-space: nowrap;",
            )?;
            doc.append_child(body, region)
        };
        match build(doc) {
            Ok(()) => Some(region),
            Err(err) => {
                tracing::debug!(target: "a11y::i18n", error = %err, "unable to create live region");
                None
            }
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// `data-i18n-params` (a JSON object) plus a numeric `data-i18n-count`.
fn element_params(doc: &Document, node: NodeId) -> MessageParams {
    let mut params = MessageParams::new();
    if let Some(raw) = doc.attribute(node, "data-i18n-params") {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => params.extend(map),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(target: "a11y::i18n", %node, error = %err, "failed to parse data-i18n-params");
            }
        }
    }
    if let Some(count) = doc
        .attribute(node, "data-i18n-count")
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|count| count.is_finite())
    {
        let value = if count.fract() == 0.0 && count.abs() < i64::MAX as f64 {
            Value::from(count as i64)
        } else {
            Value::from(count)
        };
        params.insert("count".into(), value);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn bundles() -> LocaleSource {
        let mut map = HashMap::new();
        map.insert(
            Language::En,
            json!({
                "language": {"announcement": "Language changed to {{language}}."},
                "controls": {"resetAll": {"label": "Reset All"}, "only": {"label": "English only"}},
                "items": {"one": "{{count}} item", "other": "{{count}} items"},
                "languageNames": {"en": "English", "it": "Italian"}
            }),
        );
        map.insert(
            Language::It,
            json!({
                "language": {"announcement": "Lingua cambiata in {{language}}."},
                "controls": {"resetAll": {"label": "Ripristina"}},
                "languageNames": {"it": "Italiano"}
            }),
        );
        LocaleSource::Memory(map)
    }

    fn page() -> Document {
        Document::parse_html(
            "<p id=reset data-i18n=controls.resetAll.label>Reset</p>\
             <p id=only data-i18n=controls.only.label>x</p>\
             <p id=gone data-i18n=controls.missing.label>keep me</p>\
             <button id=btn data-i18n-attr=\"aria-label:controls.resetAll.label, title:controls.missing\"></button>\
             <span id=count data-i18n=items data-i18n-count=2></span>\
             <div id=live></div>",
        )
    }

    #[tokio::test]
    async fn init_prefers_stored_language() {
        let mut doc = page();
        let store = MemoryStore::with_entry(LANGUAGE_STORAGE_KEY, "it");
        let config = I18nConfig {
            default_language: Some("en".into()),
            preferred_languages: vec!["fr-FR".into()],
            ..I18nConfig::default()
        };
        let i18n = I18n::init(config, bundles(), &mut doc, &store).await;
        assert_eq!(i18n.current_language(), Language::It);
        let reset = doc.element_by_id("reset").unwrap();
        assert_eq!(doc.text_content(reset), "Ripristina");
        let only = doc.element_by_id("only").unwrap();
        assert_eq!(doc.text_content(only), "English only");
        let gone = doc.element_by_id("gone").unwrap();
        assert_eq!(doc.text_content(gone), "keep me");
        let html = doc.document_element().unwrap();
        assert_eq!(doc.attribute(html, "lang"), Some("it"));
    }

    #[tokio::test]
    async fn switching_announces_and_notifies() {
        let mut doc = page();
        let store = MemoryStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let config = I18nConfig {
            live_region: Some("live".into()),
            on_language_applied: Some(Box::new(move |applied: &LanguageApplied| {
                sink.borrow_mut().push(applied.language)
            })),
            ..I18nConfig::default()
        };
        let mut i18n = I18n::init(config, bundles(), &mut doc, &store).await;
        assert_eq!(i18n.current_language(), Language::En);

        let applied = i18n
            .set_language(&mut doc, &store, "IT-ch", SetLanguageOptions::default())
            .await;
        assert_eq!(applied.language, Language::It);
        let live = doc.element_by_id("live").unwrap();
        assert_eq!(doc.text_content(live), "Lingua cambiata in Italiano.");
        assert_eq!(store.get(LANGUAGE_STORAGE_KEY).unwrap().as_deref(), Some("it"));
        assert_eq!(*seen.borrow(), vec![Language::En, Language::It]);

        let btn = doc.element_by_id("btn").unwrap();
        assert_eq!(doc.attribute(btn, "aria-label"), Some("Ripristina"));
        assert!(!doc.has_attribute(btn, "title"));
        let count = doc.element_by_id("count").unwrap();
        assert_eq!(doc.text_content(count), "2 items");
    }

    #[tokio::test]
    async fn missing_locale_falls_back() {
        let mut doc = page();
        let store = MemoryStore::new();
        let mut i18n = I18n::init(I18nConfig::default(), bundles(), &mut doc, &store).await;
        let applied = i18n
            .set_language(&mut doc, &store, "de", SetLanguageOptions::default())
            .await;
        assert_eq!(applied.language, Language::En);
        assert!(doc.element_by_id(FALLBACK_LIVE_REGION_ID).is_some());

        let applied = i18n
            .set_language(&mut doc, &store, "klingon", SetLanguageOptions::default())
            .await;
        assert_eq!(applied.language, Language::En);
    }
}
