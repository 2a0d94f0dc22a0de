use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use url::Url;

use crate::state::Language;

use super::I18nError;

/// Where locale documents (`<code>.json`) come from.
#[derive(Debug, Clone)]
pub enum LocaleSource {
    /// Bundles compiled into the crate.
    Embedded,
    Directory(PathBuf),
    Http { base: Url, client: reqwest::Client },
    Memory(HashMap<Language, Value>),
}

impl LocaleSource {
    /// `locales_path` when set, else `<asset_base>locales/`, else the
    /// embedded bundles. URLs with a scheme are fetched over HTTP, anything
    /// else is read from disk.
    pub fn from_paths(locales_path: &str, asset_base: &str) -> Result<Self, I18nError> {
        let root = if !locales_path.trim().is_empty() {
            locales_path.trim().to_string()
        } else if !asset_base.trim().is_empty() {
            format!("{}locales/", ensure_trailing_slash(asset_base.trim()))
        } else {
            return Ok(Self::Embedded);
        };

        if root.starts_with("http://") || root.starts_with("https://") {
            let base = Url::parse(&ensure_trailing_slash(&root))?;
            return Ok(Self::Http {
                base,
                client: reqwest::Client::new(),
            });
        }
        if let Some(path) = root.strip_prefix("file://") {
            return Ok(Self::Directory(PathBuf::from(path)));
        }
        Ok(Self::Directory(PathBuf::from(root)))
    }

    /// `Ok(None)` when the source simply has no document for `language`.
    pub async fn fetch(&self, language: Language) -> Result<Option<Value>, I18nError> {
        let file_name = format!("{}.json", language.code());
        match self {
            Self::Embedded => Ok(Some(serde_json::from_str(embedded(language))?)),
            Self::Memory(bundles) => Ok(bundles.get(&language).cloned()),
            Self::Directory(dir) => {
                let path = dir.join(&file_name);
                match tokio::fs::read_to_string(&path).await {
                    Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(err) => Err(err.into()),
                }
            }
            Self::Http { base, client } => {
                let url = base.join(&file_name)?;
                tracing::debug!(target: "a11y::i18n", url = %url, "fetching locale");
                let response = client
                    .get(url.clone())
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(I18nError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                let body = response.text().await?;
                Ok(Some(serde_json::from_str(&body)?))
            }
        }
    }
}

fn ensure_trailing_slash(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    }
}

fn embedded(language: Language) -> &'static str {
    match language {
        Language::En => include_str!("../../locales/en.json"),
        Language::It => include_str!("../../locales/it.json"),
        Language::Fr => include_str!("../../locales/fr.json"),
        Language::De => include_str!("../../locales/de.json"),
        Language::Es => include_str!("../../locales/es.json"),
        Language::Pt => include_str!("../../locales/pt.json"),
    }
}
