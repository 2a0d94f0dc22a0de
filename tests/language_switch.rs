/// Integration tests for translating the widget chrome at runtime
use a11y_stiac::assets::AssetFetcher;
use a11y_stiac::binder::Activation;
use a11y_stiac::chrome;
use a11y_stiac::i18n::{LocaleSource, LANGUAGE_STORAGE_KEY};
use a11y_stiac::state::Language;
use a11y_stiac::storage::KeyValueStore;
use a11y_stiac::{Document, MemoryStore, WidgetConfig, WidgetContext};

async fn widget(store: MemoryStore, preferred: &[&str]) -> (Document, WidgetContext) {
    widget_with(WidgetConfig::default(), store, preferred).await
}

async fn widget_with(
    config: WidgetConfig,
    store: MemoryStore,
    preferred: &[&str],
) -> (Document, WidgetContext) {
    let mut doc = Document::parse_html("<html><head></head><body><p>Copy</p></body></html>");
    let mut widget = WidgetContext::new(config, Box::new(store), AssetFetcher::new(None));
    widget.mount(&mut doc).unwrap();
    let preferred = preferred.iter().map(|code| code.to_string()).collect();
    widget.init_i18n(&mut doc, LocaleSource::Embedded, preferred).await;
    widget.restore(&mut doc, false);
    (doc, widget)
}

fn text_of(doc: &Document, id: &str) -> String {
    doc.text_content(doc.element_by_id(id).unwrap()).trim().to_string()
}

#[tokio::test]
async fn test_select_language_translates_chrome() {
    let (mut doc, mut widget) = widget(MemoryStore::new(), &[]).await;
    assert_eq!(text_of(&doc, "reset-all"), "Reset All");

    let applied = widget.select_language(&mut doc, "it").await.unwrap();
    assert_eq!(applied.language, Language::It);
    assert_eq!(text_of(&doc, "reset-all"), "Reimposta tutto");
    let html = doc.document_element().unwrap();
    assert_eq!(doc.attribute(html, "lang"), Some("it"));
    assert_eq!(
        text_of(&doc, chrome::LANGUAGE_ANNOUNCEMENT_ID),
        "Lingua impostata su Italiano."
    );
    assert_eq!(widget.state().language, Language::It);
    assert_eq!(widget.storage().get(LANGUAGE_STORAGE_KEY).unwrap().as_deref(), Some("it"));
}

#[tokio::test]
async fn test_unsupported_language_falls_back() {
    let (mut doc, mut widget) = widget(MemoryStore::new(), &[]).await;
    let applied = widget.select_language(&mut doc, "xx").await.unwrap();
    assert_eq!(applied.language, Language::En);
    assert_eq!(text_of(&doc, "reset-all"), "Reset All");
}

#[tokio::test]
async fn test_configured_default_is_used_on_first_visit() {
    let config = WidgetConfig {
        default_language: Language::It,
        ..WidgetConfig::default()
    };
    let (doc, widget) = widget_with(config, MemoryStore::new(), &["fr-FR"]).await;
    assert_eq!(widget.state().language, Language::It);
    assert_eq!(text_of(&doc, "reset-all"), "Reimposta tutto");
}

#[tokio::test]
async fn test_stored_language_wins_over_preferred() {
    let store = MemoryStore::with_entry(LANGUAGE_STORAGE_KEY, "it");
    let (doc, widget) = widget(store, &["en"]).await;
    assert_eq!(widget.state().language, Language::It);
    let html = doc.document_element().unwrap();
    assert_eq!(doc.attribute(html, "lang"), Some("it"));
}

#[tokio::test]
async fn test_text_align_announcement_is_translated() {
    let (mut doc, mut widget) = widget(MemoryStore::new(), &[]).await;
    widget.select_language(&mut doc, "it").await.unwrap();

    let control = doc.element_by_id("text-align").unwrap();
    widget.activate(&mut doc, control, Activation::Pointer);
    let status = doc
        .subtree(control)
        .into_iter()
        .find(|node| doc.has_attribute(*node, chrome::TEXT_ALIGN_STATUS_ATTR))
        .unwrap();
    assert_eq!(
        doc.text_content(status),
        "Allineamento del testo impostato su il margine iniziale."
    );
}
