//! Bounded article fetching.
//!
//! This module retrieves raw HTML for a user-supplied URL under strict
//! size and time bounds. The payload cap is enforced twice: once against
//! the declared `content-length` header (rejecting before any body bytes
//! are read) and once while streaming the body, aborting the instant the
//! running total exceeds the cap regardless of what the server declared.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use url::Url;

use crate::{LegamError, Result};

/// Default wall-clock timeout for a fetch, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default payload cap: 5 MiB.
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// HTTP client configuration for fetching web pages.
///
/// Many sites serve degraded or blocked content to clients that do not
/// look like a browser, so the default User-Agent and Accept headers
/// imitate one. That is a functional requirement, not cosmetics.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Maximum response body size in bytes.
    pub max_bytes: usize,
    /// User-Agent string sent upstream.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            max_bytes: DEFAULT_MAX_BYTES,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
        }
    }
}

/// Raw bytes fetched for a URL, decoded to text.
///
/// Created by [`fetch_url`], consumed once by the pre-sanitizer, then
/// discarded. Never persisted.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Response body decoded as (lossy) UTF-8.
    pub html: String,
    /// The parsed source URL, used as the base for URL resolution.
    pub url: Url,
}

/// Fetches raw HTML from a URL under the configured bounds.
///
/// Performs a single GET attempt: failures are surfaced to the caller,
/// who may let the user retry manually. A timed-out or oversized fetch
/// never yields a partial document.
///
/// # Errors
///
/// - [`LegamError::InvalidUrl`] when `url` is not an absolute http(s) URL
/// - [`LegamError::Timeout`] when the wall-clock timeout expires
/// - [`LegamError::UpstreamStatus`] for non-2xx upstream responses
/// - [`LegamError::PayloadTooLarge`] when either size check trips
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<RawDocument> {
    let parsed_url = Url::parse(url).map_err(|e| LegamError::InvalidUrl(e.to_string()))?;

    if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
        return Err(LegamError::InvalidUrl(
            "URL must use the http:// or https:// scheme".to_string(),
        ));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(LegamError::HttpError)?;

    let response = client
        .get(parsed_url.clone())
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                LegamError::Timeout { timeout: config.timeout }
            } else {
                LegamError::HttpError(e)
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LegamError::UpstreamStatus { status: status.as_u16() });
    }

    check_declared_length(declared_length(&response), config.max_bytes)?;

    let mut response = response;
    let mut body: Vec<u8> = Vec::new();
    loop {
        let chunk = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                LegamError::Timeout { timeout: config.timeout }
            } else {
                LegamError::HttpError(e)
            }
        })?;
        let Some(chunk) = chunk else { break };

        if body.len() + chunk.len() > config.max_bytes {
            return Err(LegamError::PayloadTooLarge { limit: config.max_bytes });
        }
        body.extend_from_slice(&chunk);
    }

    let html = String::from_utf8_lossy(&body).into_owned();

    Ok(RawDocument { html, url: parsed_url })
}

/// Reads a declared content-length header, if the server sent one.
fn declared_length(response: &reqwest::Response) -> Option<usize> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
}

/// Optimistic size check: reject before reading any body bytes when the
/// server already admits the payload is over the cap. An absent or
/// understated header is fine; the streaming check is authoritative.
fn check_declared_length(declared: Option<usize>, max_bytes: usize) -> Result<()> {
    match declared {
        Some(len) if len > max_bytes => Err(LegamError::PayloadTooLarge { limit: max_bytes }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 20);
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert!(config.user_agent.contains("Mozilla/5.0"));
    }

    #[test]
    fn test_check_declared_length() {
        assert!(check_declared_length(None, 100).is_ok());
        assert!(check_declared_length(Some(100), 100).is_ok());
        assert!(matches!(
            check_declared_length(Some(101), 100),
            Err(LegamError::PayloadTooLarge { limit: 100 })
        ));
    }

    #[tokio::test]
    async fn test_fetch_url_invalid() {
        let config = FetchConfig::default();
        let result = fetch_url("not-a-url", &config).await;
        assert!(matches!(result, Err(LegamError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_url_rejects_non_http_scheme() {
        let config = FetchConfig::default();
        let result = fetch_url("ftp://example.com/file.html", &config).await;
        assert!(matches!(result, Err(LegamError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_success_within_bounds() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/article")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><p>Hello</p></body></html>")
            .create_async()
            .await;

        let config = FetchConfig::default();
        let doc = fetch_url(&format!("{}/article", server.url()), &config)
            .await
            .expect("fetch should succeed");
        assert!(doc.html.contains("Hello"));
        assert_eq!(doc.url.path(), "/article");
    }

    #[tokio::test]
    async fn test_fetch_rejects_declared_oversize_without_reading_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/big")
            .with_status(200)
            .with_header("content-length", "6000000")
            .with_chunked_body(|w| w.write_all(b"ignored"))
            .create_async()
            .await;

        let config = FetchConfig::default();
        let result = fetch_url(&format!("{}/big", server.url()), &config).await;
        assert!(matches!(result, Err(LegamError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_fetch_aborts_on_streamed_overflow() {
        let mut server = mockito::Server::new_async().await;
        // Chunked transfer: no content-length header, so only the
        // streaming check can catch this.
        let _m = server
            .mock("GET", "/stream")
            .with_status(200)
            .with_chunked_body(|w| w.write_all(&vec![b'a'; 4096]))
            .create_async()
            .await;

        let config = FetchConfig { max_bytes: 1024, ..Default::default() };
        let result = fetch_url(&format!("{}/stream", server.url()), &config).await;
        assert!(matches!(result, Err(LegamError::PayloadTooLarge { limit: 1024 })));
    }

    #[tokio::test]
    async fn test_fetch_surfaces_upstream_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let config = FetchConfig::default();
        let result = fetch_url(&format!("{}/gone", server.url()), &config).await;
        assert!(matches!(result, Err(LegamError::UpstreamStatus { status: 404 })));
    }
}
