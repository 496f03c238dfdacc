//! Page-level metadata extraction.
//!
//! Works on the pre-sanitized document. Meta tags are probed with regexes
//! that accept both attribute orders (`property` before `content` and the
//! reverse), since real pages emit both; structural fallbacks parse the
//! document with `scraper`. Each field walks an ordered candidate chain
//! and takes the first non-empty hit, so extraction never fails: the
//! weakest candidates are derived from the URL itself.

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

/// Display-oriented metadata for a fetched page.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub has_video: bool,
}

/// Maximum excerpt length in characters before truncation.
const EXCERPT_MAX_CHARS: usize = 150;

/// Extract metadata from a pre-sanitized document.
pub fn extract_metadata(html: &str, url: &str) -> Metadata {
    Metadata {
        title: extract_title(html, url),
        excerpt: extract_excerpt(html),
        site_name: extract_site_name(html, url),
        published_time: extract_published_time(html),
        has_video: detect_video(html),
    }
}

/// Find the content of a meta tag by attribute key, accepting both
/// attribute orders.
fn meta_content(html: &str, attr: &str, key: &str) -> Option<String> {
    let key = regex::escape(key);
    let forward = format!(
        r#"(?is)<meta[^>]*{attr}\s*=\s*["']{key}["'][^>]*content\s*=\s*["']([^"']*)["']"#
    );
    let backward = format!(
        r#"(?is)<meta[^>]*content\s*=\s*["']([^"']*)["'][^>]*{attr}\s*=\s*["']{key}["']"#
    );

    for pattern in [forward, backward] {
        if let Ok(re) = Regex::new(&pattern)
            && let Some(caps) = re.captures(html)
        {
            let value = clean_text(&caps[1]);
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Decode entities and collapse surrounding whitespace.
fn clean_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw).trim().to_string()
}

fn extract_title(html: &str, url: &str) -> String {
    if let Some(title) = meta_content(html, "property", "og:title") {
        return title;
    }

    static TITLE_RE: std::sync::LazyLock<Regex> =
        std::sync::LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
    if let Some(caps) = TITLE_RE.captures(html) {
        let title = clean_text(&caps[1]);
        if !title.is_empty() {
            return title;
        }
    }

    static H1_RE: std::sync::LazyLock<Regex> =
        std::sync::LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
    if let Some(caps) = H1_RE.captures(html) {
        let title = clean_text(&strip_tags(&caps[1]));
        if !title.is_empty() {
            return title;
        }
    }

    hostname(url).unwrap_or_else(|| url.to_string())
}

fn extract_excerpt(html: &str) -> Option<String> {
    let candidate = meta_content(html, "property", "og:description")
        .or_else(|| meta_content(html, "name", "description"))
        .or_else(|| dom_excerpt(html))
        .or_else(|| first_paragraph(html));
    candidate.map(|text| truncate_excerpt(&text))
}

/// Structural excerpt candidates, tried in order of specificity.
fn dom_excerpt(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    if let Ok(sel) = Selector::parse(r#"[itemprop="description"]"#) {
        for el in doc.select(&sel) {
            let text = clean_text(&el.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    let chrome = ["header", "footer", "nav"];
    if let Ok(sel) = Selector::parse("p") {
        // First pass wants a substantial paragraph outside page chrome.
        for el in doc.select(&sel) {
            let in_chrome = el
                .ancestors()
                .filter_map(|a| match a.value() {
                    scraper::node::Node::Element(e) => Some(e.name()),
                    _ => None,
                })
                .any(|name| chrome.contains(&name));
            if in_chrome {
                continue;
            }
            let text = clean_text(&el.text().collect::<String>());
            if text.chars().count() > 50 {
                return Some(text);
            }
        }

        for el in doc.select(&sel) {
            let text = clean_text(&el.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    None
}

fn first_paragraph(html: &str) -> Option<String> {
    static P_RE: std::sync::LazyLock<Regex> =
        std::sync::LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
    for caps in P_RE.captures_iter(html) {
        let text = clean_text(&strip_tags(&caps[1]));
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// Truncate at a character boundary with a plain-ASCII ellipsis.
fn truncate_excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_MAX_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

fn extract_site_name(html: &str, url: &str) -> Option<String> {
    if let Some(name) = meta_content(html, "property", "og:site_name") {
        return Some(name);
    }
    if let Some(handle) = meta_content(html, "name", "twitter:site") {
        let name = handle.trim_start_matches('@').to_string();
        if !name.is_empty() {
            return Some(name);
        }
    }
    hostname(url)
}

fn extract_published_time(html: &str) -> Option<String> {
    meta_content(html, "property", "og:published_time")
        .or_else(|| meta_content(html, "property", "article:published_time"))
        .or_else(|| meta_content(html, "itemprop", "datePublished"))
}

/// Loose video detection: an actual `video` element, a known embed host,
/// or an iframe on a page that mentions video at all.
fn detect_video(html: &str) -> bool {
    let lower = html.to_lowercase();
    if lower.contains("<video") {
        return true;
    }
    if lower.contains("youtube.com/embed") || lower.contains("youtu.be") {
        return true;
    }
    if lower.contains("player.vimeo.com") {
        return true;
    }
    lower.contains("video") && lower.contains("<iframe")
}

fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() { None } else { Some(host.to_string()) }
}

fn strip_tags(html: &str) -> String {
    static TAG_RE: std::sync::LazyLock<Regex> =
        std::sync::LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
    TAG_RE.replace_all(html, "").into_owned()
}
