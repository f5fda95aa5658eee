use crate::config::{DEFAULT_FAVICON_ENDPOINT, StoreConfig};
use crate::error::{BkmError, BkmResult};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

/// Looks up a favicon for a bookmark URL.
///
/// `Ok(None)` means there is nothing to attach (the URL has no host, or the
/// service returned an empty body).
#[async_trait]
pub trait FaviconFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> BkmResult<Option<String>>;
}

/// Never fetches anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFavicons;

#[async_trait]
impl FaviconFetcher for NoFavicons {
    async fn fetch(&self, _url: &str) -> BkmResult<Option<String>> {
        Ok(None)
    }
}

/// Asks a favicon service for the icon of the bookmark's site and returns
/// it as a `data:` URL.
#[derive(Debug, Clone)]
pub struct HttpFaviconFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for HttpFaviconFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FAVICON_ENDPOINT)
    }
}

impl HttpFaviconFetcher {
    /// `endpoint` is the service URL the site's `scheme://host` is appended to.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.favicon_endpoint.clone())
    }

    /// The service URL queried for `bookmark_url`, if it has a host.
    pub fn request_url(&self, bookmark_url: &str) -> Option<String> {
        let parsed = Url::parse(bookmark_url).ok()?;
        let host = parsed.host_str()?;
        Some(format!("{}{}://{}", self.endpoint, parsed.scheme(), host))
    }
}

#[async_trait]
impl FaviconFetcher for HttpFaviconFetcher {
    async fn fetch(&self, url: &str) -> BkmResult<Option<String>> {
        let Some(request_url) = self.request_url(url) else {
            debug!(url, "no host to fetch a favicon for");
            return Ok(None);
        };

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(|e| BkmError::Favicon(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BkmError::Favicon(format!("{request_url} answered {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_owned();

        let body = response
            .bytes()
            .await
            .map_err(|e| BkmError::Favicon(e.to_string()))?;

        if body.is_empty() {
            return Ok(None);
        }

        debug!(%request_url, %content_type, size = body.len(), "fetched favicon");
        Ok(Some(data_url(&content_type, &body)))
    }
}

/// Encodes an image as `data:<content type>;base64,<payload>`.
pub fn data_url(content_type: &str, image: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_keeps_scheme_and_host_only() {
        let fetcher = HttpFaviconFetcher::new("http://icons.test/?domain=");
        assert_eq!(
            fetcher.request_url("https://example.com/some/page?q=1").as_deref(),
            Some("http://icons.test/?domain=https://example.com")
        );
        assert_eq!(fetcher.request_url("not a url"), None);
        assert_eq!(fetcher.request_url("mailto:someone@example.com"), None);
    }

    #[test]
    fn data_url_is_base64_encoded() {
        assert_eq!(data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }
}
