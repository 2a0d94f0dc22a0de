use std::path::{Path, PathBuf};

use a11y_stiac::assets::AssetFetcher;
use a11y_stiac::binder::Activation;
use a11y_stiac::config::{parse_flag, WidgetConfig};
use a11y_stiac::i18n::LocaleSource;
use a11y_stiac::{Document, SqliteStore, WidgetContext};
use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;
use url::Url;

const USAGE: &str = "usage: a11y-stiac <page.html> [control-id...]";

fn main() -> Result<()> {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let mut args = std::env::args().skip(1);
    let page = args.next().map(PathBuf::from).ok_or_else(|| anyhow!(USAGE))?;
    let controls: Vec<String> = args.collect();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    rt.block_on(run(&page, &controls))
}

async fn run(page: &Path, controls: &[String]) -> Result<()> {
    let html = tokio::fs::read_to_string(page)
        .await
        .with_context(|| format!("failed to read {}", page.display()))?;
    let mut doc = Document::parse_html(&html);

    let config = match std::env::var("A11Y_STIAC_CONFIG").ok().map(PathBuf::from) {
        Some(path) => WidgetConfig::load(Some(&path))
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => WidgetConfig::from_document(&doc).unwrap_or_default(),
    };

    let store = SqliteStore::new().context("failed to open preference storage")?;
    let page_url = std::fs::canonicalize(page)
        .ok()
        .and_then(|path| Url::from_file_path(path).ok());
    let locales = LocaleSource::from_paths(&config.locales_path, &config.asset_base_path)
        .context("invalid locales location")?;

    let mut widget = WidgetContext::new(config, Box::new(store), AssetFetcher::new(page_url));
    widget.mount(&mut doc).context("failed to mount widget")?;
    widget.init_i18n(&mut doc, locales, preferred_languages()).await;

    let system_reduce_motion = std::env::var("A11Y_STIAC_PREFERS_REDUCED_MOTION")
        .ok()
        .and_then(|value| parse_flag(&value))
        .unwrap_or(false);
    widget.restore(&mut doc, system_reduce_motion);

    for id in controls {
        let Some(node) = doc.element_by_id(id) else {
            tracing::warn!(control = %id, "no such control in the widget");
            continue;
        };
        if widget.activate(&mut doc, node, Activation::Pointer).is_none() {
            tracing::warn!(control = %id, "control did not change any preference");
        }
    }
    widget.flush_mutations(&mut doc);
    if let Err(err) = widget.load_pending_assets(&mut doc).await {
        tracing::warn!(error = %err, "OpenDyslexic stylesheet unavailable");
    }

    println!("{}", doc.to_html());
    Ok(())
}

/// The visitor's languages, taken from the POSIX locale variables.
fn preferred_languages() -> Vec<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.split(['.', '@']).next().unwrap_or_default().to_string())
        .filter(|code| !code.is_empty() && code != "C" && code != "POSIX")
        .collect()
}
