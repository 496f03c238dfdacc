//! High-level reading pipeline.
//!
//! [`Reader`] wires the stages together in their fixed order: fetch,
//! pre-sanitize, metadata + content extraction, presentation
//! normalization. It owns the advisory article cache; when a re-fetch of
//! a previously read URL fails, the cached extraction is served instead
//! of the error.

use crate::cache::ArticleCache;
use crate::error::Result;
use crate::extract::{ContentExtractor, ExtractedArticle, ReadabilityExtractor};
use crate::metadata::Metadata;
use crate::postprocess;
use crate::settings::DisplaySettings;

#[cfg(feature = "fetch")]
use crate::fetch::{self, FetchConfig};
#[cfg(feature = "fetch")]
use crate::{metadata, preprocess};

/// A fetched page after pre-sanitization, before content extraction.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub url: String,
    pub html: String,
    pub metadata: Metadata,
}

/// A fully processed article, ready for display.
#[derive(Debug, Clone)]
pub struct ReadArticle {
    pub article: ExtractedArticle,
    pub metadata: Metadata,
    /// Normalized presentation HTML.
    pub html: String,
}

/// Article reading pipeline with a pluggable extraction backend.
pub struct Reader {
    #[cfg(feature = "fetch")]
    fetch: FetchConfig,
    extractor: Box<dyn ContentExtractor>,
    cache: ArticleCache,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "fetch")]
            fetch: FetchConfig::default(),
            extractor: Box::new(ReadabilityExtractor::new()),
            cache: ArticleCache::default(),
        }
    }

    #[cfg(feature = "fetch")]
    pub fn with_config(fetch: FetchConfig) -> Self {
        Self { fetch, ..Self::new() }
    }

    /// Swap the extraction backend.
    pub fn with_extractor(mut self, extractor: Box<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Fetch a URL and run it through pre-sanitization and metadata
    /// extraction. The returned HTML has not yet had its main content
    /// isolated.
    #[cfg(feature = "fetch")]
    pub async fn fetch_page(&self, url: &str) -> Result<ParsedPage> {
        let raw = fetch::fetch_url(url, &self.fetch).await?;
        let final_url = raw.url.to_string();
        let html = preprocess::presanitize(&raw.html, &final_url);
        let metadata = metadata::extract_metadata(&html, &final_url);
        Ok(ParsedPage { url: final_url, html, metadata })
    }

    /// Isolate the main article content from pre-sanitized HTML and
    /// remember the result for the URL.
    pub fn extract(&self, html: &str, url: &str) -> Result<ExtractedArticle> {
        let article = self.extractor.extract(html, Some(url))?;
        self.cache.put(url, article.clone());
        Ok(article)
    }

    /// Normalize extracted content for display.
    pub fn normalize(&self, content_html: &str, settings: &DisplaySettings) -> String {
        postprocess::normalize_html(content_html, settings)
    }

    /// Run the whole pipeline for a URL.
    ///
    /// A fetch or extraction failure falls back to the cached article for
    /// the same URL when one exists; stale-but-available beats
    /// empty-with-error.
    #[cfg(feature = "fetch")]
    pub async fn read_article(&self, url: &str, settings: &DisplaySettings) -> Result<ReadArticle> {
        match self.fetch_page(url).await {
            Ok(page) => {
                let article = match self.extract(&page.html, &page.url) {
                    Ok(article) => article,
                    Err(err) => match self.cache.get(url) {
                        Some(cached) => {
                            tracing::warn!(url, %err, "extraction failed, serving cached article");
                            cached
                        }
                        None => return Err(err),
                    },
                };
                let html = self.normalize(&article.content_html, settings);
                Ok(ReadArticle { article, metadata: page.metadata, html })
            }
            Err(err) => match self.cache.get(url) {
                Some(cached) => {
                    tracing::warn!(url, %err, "fetch failed, serving cached article");
                    let metadata = metadata_from_article(&cached, url);
                    let html = self.normalize(&cached.content_html, settings);
                    Ok(ReadArticle { article: cached, metadata, html })
                }
                None => Err(err),
            },
        }
    }

    pub fn cache(&self) -> &ArticleCache {
        &self.cache
    }
}

/// Reconstruct display metadata from a cached extraction when no fresh
/// page is available.
#[cfg(feature = "fetch")]
fn metadata_from_article(article: &ExtractedArticle, url: &str) -> Metadata {
    let title = article
        .title
        .clone()
        .unwrap_or_else(|| metadata::extract_metadata("", url).title);
    Metadata {
        title,
        excerpt: article.excerpt.clone(),
        site_name: article.site_name.clone(),
        published_time: None,
        has_video: article.content_html.to_lowercase().contains("<video")
            || article.content_html.contains("youtube.com/embed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LegamError;

    struct FixedExtractor(&'static str);

    impl ContentExtractor for FixedExtractor {
        fn extract(&self, _html: &str, _url: Option<&str>) -> Result<ExtractedArticle> {
            Ok(ExtractedArticle {
                title: Some("Fixed".to_string()),
                content_html: self.0.to_string(),
                ..Default::default()
            })
        }
    }

    struct FailingExtractor;

    impl ContentExtractor for FailingExtractor {
        fn extract(&self, _html: &str, _url: Option<&str>) -> Result<ExtractedArticle> {
            Err(LegamError::ExtractionFailed)
        }
    }

    #[test]
    fn test_extract_populates_cache() {
        let reader = Reader::new().with_extractor(Box::new(FixedExtractor("<p>hello</p>")));
        let article = reader.extract("<p>hello</p>", "https://example.com/a").unwrap();
        assert_eq!(article.title.as_deref(), Some("Fixed"));
        assert!(reader.cache().get("https://example.com/a").is_some());
    }

    #[test]
    fn test_extract_failure_leaves_cache_empty() {
        let reader = Reader::new().with_extractor(Box::new(FailingExtractor));
        assert!(reader.extract("<p></p>", "https://example.com/a").is_err());
        assert!(reader.cache().is_empty());
    }

    #[test]
    fn test_normalize_applies_settings() {
        let reader = Reader::new();
        let out = reader.normalize("<p>x</p>", &DisplaySettings::default());
        assert!(out.contains("font-size: 18px"));
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_read_article_falls_back_to_cache() {
        let server = mockito::Server::new_async().await;
        let url = format!("{}/gone", server.url());

        let reader = Reader::new().with_extractor(Box::new(FixedExtractor("<p>cached body</p>")));
        // Seed the cache, then fetch a URL the server rejects.
        reader.extract("<p>cached body</p>", &url).unwrap();

        let read = reader.read_article(&url, &DisplaySettings::default()).await.unwrap();
        assert!(read.html.contains("cached body"));
        assert_eq!(read.metadata.title, "Fixed");
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_read_article_error_without_cache() {
        let server = mockito::Server::new_async().await;
        let url = format!("{}/gone", server.url());
        let reader = Reader::new();
        let result = reader.read_article(&url, &DisplaySettings::default()).await;
        assert!(matches!(result, Err(LegamError::UpstreamStatus { status: 501 })));
    }
}
