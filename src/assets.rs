//! Stylesheets the widget pulls in lazily, such as the OpenDyslexic face.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::dom::{DomError, Document, NodeId};

pub const OPEN_DYSLEXIC_LINK_ID: &str = "stiac-accessibility-open-dyslexic";
pub const ASSET_OWNER: &str = "stiac-accessibility";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to read asset: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid asset URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("asset request to {url} returned {status}")]
    Status { url: String, status: u16 },
    #[error("cannot resolve {0} without a base URL")]
    Unresolvable(String),
    #[error("failed to attach stylesheet link: {0}")]
    Dom(#[from] DomError),
}

/// Fetches asset bodies over HTTP(S) or from `file://` URLs. Relative
/// references resolve against `base`, normally the host page's URL.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    base: Option<Url>,
}

impl AssetFetcher {
    pub fn new(base: Option<Url>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    pub fn resolve(&self, href: &str) -> Result<Url, AssetError> {
        match Url::parse(href) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base
                    .as_ref()
                    .ok_or_else(|| AssetError::Unresolvable(href.to_string()))?;
                Ok(base.join(href)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn fetch(&self, href: &str) -> Result<String, AssetError> {
        let url = self.resolve(href)?;
        tracing::debug!(target: "a11y::assets", url = %url, "fetching asset");
        match url.scheme() {
            "file" => {
                let path: PathBuf = url
                    .to_file_path()
                    .map_err(|_| AssetError::Unresolvable(url.to_string()))?;
                Ok(tokio::fs::read_to_string(path).await?)
            }
            _ => {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AssetError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Ok(response.text().await?)
            }
        }
    }
}

/// Injects the OpenDyslexic stylesheet link at most once per document.
#[derive(Debug)]
pub struct AssetLoader {
    fetcher: AssetFetcher,
    href: String,
    debug: bool,
}

impl AssetLoader {
    pub fn new(fetcher: AssetFetcher, href: impl Into<String>, debug: bool) -> Self {
        Self {
            fetcher,
            href: href.into(),
            debug,
        }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    /// Adds the link to `<head>` and waits for its stylesheet. A failed load
    /// removes the link again, so the next call retries from scratch.
    pub async fn ensure_open_dyslexic(&self, doc: &mut Document) -> Result<(), AssetError> {
        if doc.element_by_id(OPEN_DYSLEXIC_LINK_ID).is_some() {
            return Ok(());
        }
        let Some(head) = doc.head() else {
            return Ok(());
        };

        let link = self.attach_link(doc, head)?;
        match self.fetcher.fetch(&self.href).await {
            Ok(_) => {
                tracing::debug!(target: "a11y::assets", href = %self.href, "OpenDyslexic stylesheet loaded");
                Ok(())
            }
            Err(err) => {
                if doc.is_connected(link) {
                    if let Err(remove_err) = doc.remove_node(link) {
                        tracing::debug!(target: "a11y::assets", error = %remove_err, "unable to detach failed link");
                    }
                }
                if self.debug {
                    tracing::warn!(target: "a11y::debug", href = %self.href, error = %err, "failed to load OpenDyslexic stylesheet");
                } else {
                    tracing::debug!(target: "a11y::assets", href = %self.href, error = %err, "failed to load OpenDyslexic stylesheet");
                }
                Err(err)
            }
        }
    }

    fn attach_link(&self, doc: &mut Document, head: NodeId) -> Result<NodeId, DomError> {
        let link = doc.create_element("link");
        doc.set_attribute(link, "id", OPEN_DYSLEXIC_LINK_ID)?;
        doc.set_attribute(link, "rel", "stylesheet")?;
        doc.set_attribute(link, "href", &self.href)?;
        doc.set_attribute(link, "data-owner", ASSET_OWNER)?;
        doc.append_child(head, link)?;
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn relative_references_need_a_base() {
        let fetcher = AssetFetcher::new(None);
        assert!(matches!(
            fetcher.resolve("open-dyslexic.css"),
            Err(AssetError::Unresolvable(_))
        ));
        let base = Url::parse("https://site.example/blog/post.html").unwrap();
        let fetcher = AssetFetcher::new(Some(base));
        assert_eq!(
            fetcher.resolve("../assets/open-dyslexic.css").unwrap().as_str(),
            "https://site.example/assets/open-dyslexic.css"
        );
    }

    #[tokio::test]
    async fn link_is_injected_once() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("open-dyslexic.css"),
            "@font-face { font-family: OpenDyslexic; }",
        )
        .unwrap();
        let base = Url::from_directory_path(dir.path()).unwrap();
        let loader = AssetLoader::new(AssetFetcher::new(Some(base)), "open-dyslexic.css", false);

        let mut doc = Document::new();
        loader.ensure_open_dyslexic(&mut doc).await.unwrap();
        loader.ensure_open_dyslexic(&mut doc).await.unwrap();
        let head = doc.head().unwrap();
        let links = doc.elements_by_tag(head, "link");
        assert_eq!(links.len(), 1);
        assert_eq!(doc.attribute(links[0], "data-owner"), Some(ASSET_OWNER));
    }

    #[tokio::test]
    async fn failed_load_removes_link_and_retries() {
        let dir = TempDir::new().unwrap();
        let base = Url::from_directory_path(dir.path()).unwrap();
        let loader = AssetLoader::new(AssetFetcher::new(Some(base)), "open-dyslexic.css", true);

        let mut doc = Document::new();
        assert!(matches!(loader.ensure_open_dyslexic(&mut doc).await, Err(AssetError::Io(_))));
        assert!(doc.element_by_id(OPEN_DYSLEXIC_LINK_ID).is_none());

        std::fs::write(dir.path().join("open-dyslexic.css"), "").unwrap();
        loader.ensure_open_dyslexic(&mut doc).await.unwrap();
        assert!(doc.element_by_id(OPEN_DYSLEXIC_LINK_ID).is_some());
    }
}
