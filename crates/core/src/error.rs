//! Error types for Legam operations.
//!
//! This module defines the main error type [`LegamError`] which represents
//! all terminal failures of the article pipeline: fetching, parsing, and
//! content extraction.
//!
//! Degraded-sanitization conditions (an unparsable base URL, a malformed
//! individual resource URL, a tree parse that fails mid-stage) are NOT
//! errors: those are absorbed where they occur, logged, and the pipeline
//! continues with the best available partial result.
//!
//! # Example
//!
//! ```rust
//! use legam_core::{LegamError, Result};
//!
//! fn require_content(html: &str) -> Result<&str> {
//!     if html.is_empty() {
//!         return Err(LegamError::ExtractionFailed);
//!     }
//!     Ok(html)
//! }
//! ```

use thiserror::Error;

/// Main error type for article fetching and processing.
///
/// Every variant is terminal for the request it occurred in; none are
/// retried automatically. The HTTP boundary maps variants to statuses
/// (400/408/413/upstream passthrough/500).
#[derive(Error, Debug)]
pub enum LegamError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, connection issues, and other
    /// transport-level problems.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when fetching a URL exceeds the configured wall-clock
    /// timeout. Partially-read bytes are discarded.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    ///
    /// Returned when a URL cannot be parsed or is not an absolute
    /// http(s) URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The response body exceeds the configured size cap.
    ///
    /// Checked twice: optimistically against a declared content-length
    /// header, and authoritatively while streaming the body.
    #[error("Payload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    /// The upstream server answered with a non-2xx status.
    #[error("Upstream server returned status {status}")]
    UpstreamStatus { status: u16 },

    /// No confident main-content region could be identified.
    ///
    /// This is a recoverable failure for callers holding a cached copy
    /// of the article; otherwise it is surfaced as-is.
    #[error("No readable content could be extracted from the document")]
    ExtractionFailed,
}

/// Result type alias for LegamError.
///
/// This is a convenience alias for `std::result::Result<T, LegamError>`.
pub type Result<T> = std::result::Result<T, LegamError>;
