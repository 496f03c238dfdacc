//! Content extraction boundary.
//!
//! The readability algorithm itself is a third-party black box; this
//! module pins it behind the [`ContentExtractor`] trait so the rest of
//! the pipeline depends only on the [`ExtractedArticle`] shape. The
//! default implementation wraps `dom_smoothie` and shields callers from
//! library panics, mapping every failure mode to
//! [`LegamError::ExtractionFailed`].

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::error::{LegamError, Result};

/// Article content and fields produced by extraction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub content_html: String,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    pub excerpt: Option<String>,
    pub lang: Option<String>,
}

/// Pluggable extraction backend.
///
/// Implementations take pre-sanitized HTML plus the page URL and return
/// the main article content, or [`LegamError::ExtractionFailed`] when no
/// article can be isolated.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, url: Option<&str>) -> Result<ExtractedArticle>;
}

/// Default backend built on the `dom_smoothie` readability port.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadabilityExtractor;

impl ReadabilityExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, url: Option<&str>) -> Result<ExtractedArticle> {
        // The parser is third-party code over arbitrary input; a panic in
        // there must not take down the caller.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let config = dom_smoothie::Config::default();
            let mut readability = dom_smoothie::Readability::new(html, url, Some(config))
                .map_err(|err| {
                    tracing::debug!(%err, "readability rejected document");
                    LegamError::ExtractionFailed
                })?;
            let article = readability.parse().map_err(|err| {
                tracing::debug!(%err, "readability found no article content");
                LegamError::ExtractionFailed
            })?;

            let content_html = article.content.to_string();
            if content_html.trim().is_empty() {
                return Err(LegamError::ExtractionFailed);
            }

            Ok(ExtractedArticle {
                title: non_empty(article.title),
                content_html,
                byline: article.byline.and_then(non_empty),
                site_name: article.site_name.and_then(non_empty),
                excerpt: article.excerpt.and_then(non_empty),
                lang: article.lang.and_then(non_empty),
            })
        }));

        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("extraction backend panicked");
                Err(LegamError::ExtractionFailed)
            }
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
