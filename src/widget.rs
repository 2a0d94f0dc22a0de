//! One widget instance bound to one host document.
//!
//! Every activation runs the same pipeline: store transition, engine apply,
//! observer sync, save, chrome sync. The document is borrowed per call, so
//! the context never outlives or aliases the page it decorates.

use crate::assets::{AssetError, AssetFetcher, AssetLoader};
use crate::binder::{self, Activation, Control, Transition};
use crate::chrome;
use crate::config::WidgetConfig;
use crate::dom::{DomError, Document, NodeId};
use crate::engine::{Engine, PointerPosition};
use crate::i18n::{I18n, I18nConfig, LanguageApplied, LocaleSource, SetLanguageOptions};
use crate::observe::{DeliveryStats, ObservationLayer};
use crate::persistence::PersistenceAdapter;
use crate::state::{PreferenceState, PreferenceStore};
use crate::storage::KeyValueStore;

pub struct WidgetContext {
    config: WidgetConfig,
    store: PreferenceStore,
    persistence: PersistenceAdapter<Box<dyn KeyValueStore>>,
    engine: Engine,
    observers: ObservationLayer,
    i18n: Option<I18n>,
    assets: AssetLoader,
    root: Option<NodeId>,
    font_asset_pending: bool,
}

impl std::fmt::Debug for WidgetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetContext")
            .field("state", self.store.get())
            .field("root", &self.root)
            .field("i18n", &self.i18n)
            .finish_non_exhaustive()
    }
}

impl WidgetContext {
    pub fn new(config: WidgetConfig, store: Box<dyn KeyValueStore>, fetcher: AssetFetcher) -> Self {
        let assets = AssetLoader::new(fetcher, config.open_dyslexic_href(), config.is_debug());
        Self {
            store: PreferenceStore::new(config.default_position),
            persistence: PersistenceAdapter::new(store, config.default_position),
            engine: Engine::new(),
            observers: ObservationLayer::new(),
            i18n: None,
            assets,
            root: None,
            font_asset_pending: false,
            config,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> &PreferenceState {
        self.store.get()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn observers(&self) -> &ObservationLayer {
        &self.observers
    }

    pub fn i18n(&self) -> Option<&I18n> {
        self.i18n.as_ref()
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        &**self.persistence.store()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn mount(&mut self, doc: &mut Document) -> Result<NodeId, DomError> {
        let root = chrome::mount(doc, &self.config)?;
        self.root = Some(root);
        chrome::sync(doc, self.store.get(), &self.config);
        Ok(root)
    }

    /// Loads the interface language and translates the chrome. `preferred`
    /// is the visitor's language list, most wanted first.
    pub async fn init_i18n(
        &mut self,
        doc: &mut Document,
        source: LocaleSource,
        preferred: Vec<String>,
    ) {
        let config = I18nConfig {
            default_language: Some(self.config.default_language.code().to_string()),
            fallback_language: Some(self.config.fallback_language.code().to_string()),
            supported_languages: self
                .config
                .supported_languages
                .iter()
                .map(|language| language.code().to_string())
                .collect(),
            preferred_languages: preferred,
            root: self.root,
            live_region: Some(chrome::LANGUAGE_ANNOUNCEMENT_ID.to_string()),
            ..I18nConfig::default()
        };
        let i18n = I18n::init(config, source, doc, &**self.persistence.store()).await;
        self.store.set_language(i18n.current_language());
        if let Err(err) = chrome::render_language_options(doc, Some(&i18n), &self.config) {
            tracing::debug!(target: "a11y::i18n", error = %err, "unable to render language options");
        }
        self.i18n = Some(i18n);
    }

    /// Replaces the in-memory state with the saved one, if any, and applies
    /// it in full. `system_reduce_motion` is the current OS preference.
    pub fn restore(&mut self, doc: &mut Document, system_reduce_motion: bool) {
        let language = self.store.get().language;
        if let Some(mut saved) = self.persistence.load() {
            saved.language = language;
            self.store.replace(saved);
        }
        self.store.set_system_reduce_motion(system_reduce_motion);
        self.engine.apply_all(doc, self.store.get());
        self.observers.sync(doc, &self.engine);
        self.font_asset_pending = self.store.get().dyslexia_font;
        chrome::sync(doc, self.store.get(), &self.config);
    }

    /// Handles a click or key press on `target`. Returns what changed, or
    /// `None` when the event did not activate a preference control.
    pub fn activate(
        &mut self,
        doc: &mut Document,
        target: NodeId,
        activation: Activation,
    ) -> Option<Transition> {
        if !activation.triggers() {
            return None;
        }
        let control = binder::resolve_control(doc, target)?;
        self.activate_control(doc, control)
    }

    pub fn activate_control(&mut self, doc: &mut Document, control: Control) -> Option<Transition> {
        if control == Control::PanelToggle {
            if let Err(err) = chrome::toggle_panel(doc) {
                tracing::debug!(target: "a11y::engine", error = %err, "unable to toggle panel");
            }
            return None;
        }

        let transition = binder::transition(
            &mut self.store,
            control,
            self.config.position_controls_enabled,
        )?;
        binder::apply(&mut self.engine, doc, self.store.get(), control);
        self.observers.sync(doc, &self.engine);
        self.save();
        chrome::sync(doc, self.store.get(), &self.config);

        if control == Control::TextAlign {
            let message =
                binder::text_align_message(self.i18n.as_ref(), self.store.get().text_align);
            if let Err(err) = chrome::set_text_align_status(doc, &message) {
                tracing::debug!(target: "a11y::engine", error = %err, "unable to announce text alignment");
            }
        }
        if transition.needs_font_asset {
            self.font_asset_pending = true;
        }
        tracing::debug!(target: "a11y::engine", control = control.id(), "control activated");
        Some(transition)
    }

    /// OS `prefers-reduced-motion` changed. A locked user choice wins, so
    /// the engine only follows when nothing was chosen explicitly.
    pub fn set_system_reduce_motion(&mut self, doc: &mut Document, reduce: bool) {
        let locked = self.store.get().reduce_motion.locked();
        let effective = self.store.set_system_reduce_motion(reduce);
        if locked {
            return;
        }
        self.engine.set_reduce_motion(doc, effective);
        self.observers.sync(doc, &self.engine);
        chrome::sync(doc, self.store.get(), &self.config);
    }

    /// Delivers queued host mutations to the tracked effects.
    pub fn flush_mutations(&mut self, doc: &mut Document) -> DeliveryStats {
        self.observers.deliver(doc, &mut self.engine)
    }

    pub fn pointer_moved(&mut self, doc: &mut Document, pointer: PointerPosition) {
        self.engine.pointer_moved(doc, pointer);
    }

    pub fn pointer_hovered(&mut self, doc: &mut Document, target: NodeId, entering: bool) {
        self.engine.pointer_hovered(doc, target, entering);
    }

    /// Switches the interface language. `None` until [`Self::init_i18n`]
    /// has run.
    pub async fn select_language(
        &mut self,
        doc: &mut Document,
        code: &str,
    ) -> Option<LanguageApplied> {
        let i18n = self.i18n.as_mut()?;
        let options = SetLanguageOptions {
            root: self.root,
            ..SetLanguageOptions::default()
        };
        let applied = i18n.set_language(doc, &**self.persistence.store(), code, options).await;
        self.store.set_language(applied.language);
        if let Err(err) = chrome::render_language_options(doc, self.i18n.as_ref(), &self.config) {
            tracing::debug!(target: "a11y::i18n", error = %err, "unable to render language options");
        }
        self.save();
        Some(applied)
    }

    /// Loads the OpenDyslexic stylesheet if the font was switched on since
    /// the last call. A failure leaves the preference on and retries next
    /// time.
    pub async fn load_pending_assets(&mut self, doc: &mut Document) -> Result<(), AssetError> {
        if !self.font_asset_pending || !self.store.get().dyslexia_font {
            self.font_asset_pending = false;
            return Ok(());
        }
        self.assets.ensure_open_dyslexic(doc).await?;
        self.font_asset_pending = false;
        Ok(())
    }

    /// Stops observing the host page.
    pub fn teardown(&mut self, doc: &mut Document) {
        self.observers.disconnect_all(doc);
    }

    fn save(&self) {
        if let Err(err) = self.persistence.save(self.store.get()) {
            tracing::warn!(target: "a11y::persist", error = %err, "unable to save preferences");
        }
    }
}
