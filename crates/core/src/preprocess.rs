//! Pre-sanitization of fetched HTML before content extraction.
//!
//! Three ordered stages, each a string-to-string transform:
//!
//! 1. strip executable and structural noise (`script`, `style`, `form`,
//!    HTML comments),
//! 2. rewrite resource references: absolutize `img`/`a`/`iframe` URLs
//!    against the page URL, lazy-load images, and harden embedded frames,
//! 3. repair malformed list markup left behind by sloppy CMS output.
//!
//! Every stage degrades softly: when a rewrite or parse fails, the stage
//! returns its input unchanged and logs, so a broken page still flows
//! through to extraction.

use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use url::Url;

use crate::dom::{self, EditPlan};

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Attribute value for hardened `iframe` embeds.
const IFRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// Run the full pre-sanitization pipeline.
///
/// `base_url` is the final URL the document was fetched from; relative
/// resource references are resolved against it. An unparseable base URL
/// skips the rewrite stage rather than failing the pipeline.
pub fn presanitize(html: &str, base_url: &str) -> String {
    let stripped = strip_unsafe(html);

    let rewritten = match Url::parse(base_url) {
        Ok(base) => rewrite_resources(&stripped, &base),
        Err(err) => {
            tracing::warn!(url = base_url, %err, "unparseable base URL, skipping resource rewrite");
            stripped
        }
    };

    repair_lists(&rewritten)
}

/// Remove script, style, and form elements plus HTML comments
fn strip_unsafe(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                lol_html::element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                lol_html::element!("form", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    match rewriter.write(html.as_bytes()) {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    match rewriter.end() {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    let stripped = if output.is_empty() { html.to_string() } else { output };
    COMMENT_RE.replace_all(&stripped, "").into_owned()
}

/// Absolutize and harden resource references
fn rewrite_resources(html: &str, base: &Url) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("img", |el| {
                    if let Some(src) = el.get_attribute("src")
                        && !src.starts_with("http")
                        && !src.starts_with("data:")
                    {
                        match base.join(&src) {
                            Ok(absolute) => {
                                let _ = el.set_attribute("src", absolute.as_str());
                            }
                            Err(err) => {
                                tracing::warn!(src, %err, "skipping unresolvable image source");
                            }
                        }
                    }
                    let _ = el.set_attribute("loading", "lazy");
                    let style = match el.get_attribute("style") {
                        Some(existing) if !existing.trim().is_empty() => {
                            format!("{}; max-width: 100%", existing.trim().trim_end_matches(';'))
                        }
                        _ => "max-width: 100%".to_string(),
                    };
                    let _ = el.set_attribute("style", &style);
                    Ok(())
                }),
                lol_html::element!("a", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && !href.starts_with("http")
                        && !href.starts_with('#')
                        && !href.starts_with("mailto:")
                    {
                        match base.join(&href) {
                            Ok(absolute) => {
                                let _ = el.set_attribute("href", absolute.as_str());
                            }
                            Err(err) => {
                                tracing::warn!(href, %err, "skipping unresolvable link");
                            }
                        }
                    }
                    if el.get_attribute("href").is_some_and(|h| h.starts_with("http")) {
                        let _ = el.set_attribute("target", "_blank");
                        let _ = el.set_attribute("rel", "noopener noreferrer");
                    }
                    Ok(())
                }),
                lol_html::element!("iframe", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        let mut src = src;
                        if !src.starts_with("http") {
                            match base.join(&src) {
                                Ok(absolute) => src = absolute.to_string(),
                                Err(err) => {
                                    tracing::warn!(src, %err, "skipping unresolvable frame source");
                                }
                            }
                        }
                        if src.contains("youtube.com") && src.starts_with("http:") {
                            src = src.replacen("http:", "https:", 1);
                        }
                        let _ = el.set_attribute("src", &src);
                    }
                    let _ = el.set_attribute("allowfullscreen", "true");
                    let _ = el.set_attribute("loading", "lazy");
                    let _ = el.set_attribute("allow", IFRAME_ALLOW);
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    match rewriter.write(html.as_bytes()) {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    match rewriter.end() {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Repair list markup so extraction sees well-formed lists.
///
/// Three fixes, applied together in one plan:
/// - a `ul`/`ol` that is a direct child of another list is moved into the
///   preceding `li` sibling (the markup a missing close tag intended),
/// - every other non-`li` element child of a list is wrapped in an `li`,
///   a nested list with no `li` to adopt it included,
/// - lists left with no content are dropped.
fn repair_lists(html: &str) -> String {
    let doc = Html::parse_document(html);
    let list_sel = match scraper::Selector::parse("ul, ol") {
        Ok(sel) => sel,
        Err(_) => return html.to_string(),
    };

    let mut plan = EditPlan::new();

    for list in doc.select(&list_sel) {
        let node = *list;
        let parent_is_list = node
            .parent()
            .and_then(|p| dom::element_name(&p))
            .is_some_and(|name| name == "ul" || name == "ol");

        if parent_is_list
            && let Some(prev) = dom::prev_sibling_element(node)
            && dom::element_name(&prev) == Some("li")
        {
            plan.adopt(prev.id(), node.id());
        }
    }

    // Adoption is settled for the whole tree before wrapping: any child
    // that is not an li and was not re-parented gets wrapped, a nested
    // list with no preceding li included.
    for list in doc.select(&list_sel) {
        for child in (*list).children() {
            if let Some(name) = dom::element_name(&child)
                && name != "li"
                && !plan.is_removed(child.id())
            {
                plan.wrap(child.id(), "li", Vec::new());
            }
        }
    }

    // Second sweep: a list is empty when every child is whitespace or was
    // re-parented away above.
    for list in doc.select(&list_sel) {
        let node = *list;
        if plan.is_removed(node.id()) {
            continue;
        }
        let has_content = node.children().any(|child| {
            !dom::is_whitespace_text(&child)
                && !child.value().is_comment()
                && !plan.is_removed(child.id())
        });
        if !has_content {
            plan.remove(node.id());
        }
    }

    dom::serialize_document(&doc, &plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/articles/post";

    #[test]
    fn test_scripts_styles_forms_removed() {
        let html = r#"<html><body><p>text</p><script>alert(1)</script><style>p{}</style><form><input></form></body></html>"#;
        let out = presanitize(html, BASE);
        assert!(out.contains("<p>text</p>"));
        assert!(!out.contains("script"));
        assert!(!out.contains("style"));
        assert!(!out.contains("form"));
    }

    #[test]
    fn test_comments_removed() {
        let out = presanitize("<body><p>keep</p><!-- ad marker --></body>", BASE);
        assert!(out.contains("keep"));
        assert!(!out.contains("ad marker"));
    }

    #[test]
    fn test_relative_image_absolutized_and_lazy() {
        let out = presanitize(r#"<body><img src="/img/pic.png"></body>"#, BASE);
        assert!(out.contains(r#"src="https://example.com/img/pic.png""#));
        assert!(out.contains(r#"loading="lazy""#));
        assert!(out.contains("max-width: 100%"));
    }

    #[test]
    fn test_data_uri_image_untouched() {
        let out = presanitize(r#"<body><img src="data:image/png;base64,AAAA"></body>"#, BASE);
        assert!(out.contains(r#"src="data:image/png;base64,AAAA""#));
    }

    #[test]
    fn test_relative_link_absolutized_with_rel() {
        let out = presanitize(r#"<body><a href="../other">go</a></body>"#, BASE);
        assert!(out.contains(r#"href="https://example.com/other""#));
        assert!(out.contains(r#"target="_blank""#));
        assert!(out.contains(r#"rel="noopener noreferrer""#));
    }

    #[test]
    fn test_fragment_and_mailto_links_untouched() {
        let out = presanitize(
            r##"<body><a href="#section">jump</a><a href="mailto:a@b.c">mail</a></body>"##,
            BASE,
        );
        assert!(out.contains(r##"href="#section""##));
        assert!(out.contains(r#"href="mailto:a@b.c""#));
        assert!(!out.contains(r##"href="#section" target"##));
    }

    #[test]
    fn test_youtube_iframe_upgraded_and_hardened() {
        let out = presanitize(
            r#"<body><iframe src="http://www.youtube.com/embed/abc"></iframe></body>"#,
            BASE,
        );
        assert!(out.contains(r#"src="https://www.youtube.com/embed/abc""#));
        assert!(out.contains(r#"allowfullscreen="true""#));
        assert!(out.contains("encrypted-media"));
    }

    #[test]
    fn test_nested_list_adopted_into_preceding_item() {
        let out = presanitize("<body><ul><li>a</li><ul><li>b</li></ul></ul></body>", BASE);
        assert!(out.contains("<li>a<ul><li>b</li></ul></li>"));
    }

    #[test]
    fn test_nested_list_without_preceding_item_wrapped() {
        let out = presanitize("<body><ul><ul><li>b</li></ul></ul></body>", BASE);
        assert!(out.contains("<li><ul><li>b</li></ul></li>"));
    }

    #[test]
    fn test_empty_list_removed() {
        let out = presanitize("<body><p>x</p><ul>   </ul></body>", BASE);
        assert!(out.contains("<p>x</p>"));
        assert!(!out.contains("<ul>"));
    }

    #[test]
    fn test_stray_list_child_wrapped() {
        let out = presanitize("<body><ul><li>a</li><p>stray</p></ul></body>", BASE);
        assert!(out.contains("<li><p>stray</p></li>"));
    }

    #[test]
    fn test_bad_base_url_still_strips() {
        let out = presanitize("<body><script>x</script><p>ok</p></body>", "not a url");
        assert!(out.contains("<p>ok</p>"));
        assert!(!out.contains("script"));
    }
}
