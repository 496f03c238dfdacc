//! Post-sanitization and presentation normalization of extracted content.
//!
//! [`normalize_html`] runs two stages over the extracted article fragment:
//!
//! 1. an allow-list sanitizer (streaming, via `lol_html`) that keeps only
//!    permitted tags and attributes, drops executable content and inline
//!    SVG outright, and unwraps everything else,
//! 2. a presentation pass (tree-based, via the edit plan) that decodes
//!    residual entities and applies deterministic inline styling to
//!    embeds, media, tables, lists, code, headings, paragraphs, and
//!    links, parameterized by [`DisplaySettings`].
//!
//! The whole transform is a pure function of `(html, settings)`: fixed
//! pass order, tree-order iteration, no clocks, no randomness. Running it
//! on its own output converges after one pass.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::dom::{self, EditPlan};
use crate::settings::DisplaySettings;

/// Tags the sanitizer keeps. Wider than a generic sanitizer default:
/// `iframe` survives so preserved video embeds keep working.
const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "article", "aside", "b", "blockquote", "br", "caption", "code", "dd", "div",
    "dl", "dt", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i",
    "iframe", "img", "li", "mark", "ol", "p", "pre", "q", "s", "section", "small", "source",
    "span", "strong", "sub", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "time", "tr",
    "u", "ul", "video",
];

/// Attributes the sanitizer keeps on allowed elements.
const ALLOWED_ATTRS: &[&str] = &[
    "allowfullscreen", "frameborder", "target", "src", "width", "height", "allow", "loading",
    "href", "alt", "title", "id", "class", "style", "rel", "colspan", "rowspan", "datetime",
    "controls", "preload", "poster",
];

/// Tags removed together with their content.
const DROPPED_TAGS: &[&str] = &["script", "style", "form", "svg", "noscript"];

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Heading font scale relative to the base font size, h1 through h6.
const HEADING_SCALE: [f32; 6] = [1.8, 1.5, 1.3, 1.1, 1.0, 0.9];

const UL_MARKERS: [&str; 3] = ["disc", "circle", "square"];
const OL_MARKERS: [&str; 3] = ["decimal", "lower-alpha", "lower-roman"];

const IFRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// Sanitize and normalize an extracted article fragment for display.
pub fn normalize_html(html: &str, settings: &DisplaySettings) -> String {
    let sanitized = sanitize(html);
    present(&sanitized, settings)
}

/// Allow-list sanitization pass
fn sanitize(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("*", |el| {
                let tag = el.tag_name();
                if DROPPED_TAGS.contains(&tag.as_str()) {
                    el.remove();
                    return Ok(());
                }
                if !ALLOWED_TAGS.contains(&tag.as_str()) {
                    el.remove_and_keep_content();
                    return Ok(());
                }

                let names: Vec<String> =
                    el.attributes().iter().map(|a| a.name()).collect();
                for name in names {
                    if name.starts_with("on") || !ALLOWED_ATTRS.contains(&name.as_str()) {
                        el.remove_attribute(&name);
                        continue;
                    }
                    if (name == "href" || name == "src")
                        && let Some(value) = el.get_attribute(&name)
                    {
                        let value = value.trim().to_lowercase();
                        if value.starts_with("javascript:")
                            || value.starts_with("vbscript:")
                            || value.starts_with("data:text/html")
                        {
                            el.remove_attribute(&name);
                        }
                    }
                }
                Ok(())
            })],
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

    let sanitized = if output.is_empty() { html.to_string() } else { output };
    COMMENT_RE.replace_all(&sanitized, "").into_owned()
}

/// Presentation pass: entity decoding plus deterministic inline styling.
fn present(html: &str, settings: &DisplaySettings) -> String {
    let doc = Html::parse_fragment(html);
    let mut plan = EditPlan::new();
    plan.decode_text_nodes();

    style_embeds(&doc, &mut plan, settings);
    style_videos(&doc, &mut plan, settings);
    style_images(&doc, &mut plan, settings);
    style_figures(&doc, &mut plan);
    style_code(&doc, &mut plan);
    style_tables(&doc, &mut plan);
    style_blockquotes(&doc, &mut plan);
    style_lists(&doc, &mut plan);
    style_headings(&doc, &mut plan, settings);
    style_paragraphs(&doc, &mut plan, settings);
    style_links(&doc, &mut plan);

    dom::serialize_fragment(&doc, &plan)
}

fn selector(css: &str) -> Selector {
    // Only called with fixed, known-valid selector strings.
    Selector::parse(css).unwrap_or_else(|_| unreachable!())
}

fn is_video_embed(src: &str) -> bool {
    let src = src.to_lowercase();
    src.contains("youtube.com")
        || src.contains("youtu.be")
        || src.contains("vimeo.com")
        || src.contains("video")
}

fn style_embeds(doc: &Html, plan: &mut EditPlan, settings: &DisplaySettings) {
    for iframe in doc.select(&selector("iframe")) {
        let Some(src) = iframe.value().attr("src") else {
            continue;
        };
        if !is_video_embed(src) {
            continue;
        }

        let id = iframe.id();
        // An iframe already inside a wrapper from a previous normalization
        // keeps it; re-wrapping would nest containers on every pass.
        let already_wrapped = iframe.parent().is_some_and(|p| match p.value() {
            scraper::node::Node::Element(el) => {
                el.name() == "div" && el.attr("class").is_some_and(|c| c.contains("video-container"))
            }
            _ => false,
        });
        if src.contains("youtube.com") && src.starts_with("http:") {
            plan.set_attr(id, "src", &src.replacen("http:", "https:", 1));
        }
        plan.set_attr(id, "allowfullscreen", "true");
        plan.set_attr(id, "allow", IFRAME_ALLOW);
        plan.set_attr(id, "loading", "lazy");
        plan.style_all(
            id,
            &[
                ("position", "absolute"),
                ("top", "0"),
                ("left", "0"),
                ("width", "100%"),
                ("height", "100%"),
                ("border", "0"),
            ],
        );

        // 16:9 aspect-ratio container via the padding-bottom trick.
        let mut wrapper_style = String::from(
            "position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden; max-width: 100%; margin: 1.5em 0",
        );
        if !settings.show_videos {
            wrapper_style.push_str("; display: none");
        }
        if already_wrapped {
            if let Some(parent) = iframe.parent() {
                let visibility = if settings.show_videos { "block" } else { "none" };
                plan.style(parent.id(), "display", visibility);
            }
        } else {
            plan.wrap(
                id,
                "div",
                vec![
                    ("class".to_string(), "video-container".to_string()),
                    ("style".to_string(), wrapper_style),
                ],
            );
        }
    }
}

/// Caption-like element: a `figcaption` or anything carrying a caption class.
fn is_caption(node: &ego_tree::NodeRef<'_, scraper::node::Node>) -> bool {
    match node.value() {
        scraper::node::Node::Element(el) => {
            el.name() == "figcaption"
                || el.attr("class").is_some_and(|c| c.contains("caption"))
        }
        _ => false,
    }
}

fn style_videos(doc: &Html, plan: &mut EditPlan, settings: &DisplaySettings) {
    for video in doc.select(&selector("video")) {
        let id = video.id();
        if settings.show_videos {
            plan.style_all(id, &[("display", "block"), ("max-width", "100%"), ("margin", "1.5em auto")]);
            plan.set_attr(id, "controls", "");
            plan.set_attr(id, "preload", "metadata");
        } else {
            plan.style(id, "display", "none");
            if let Some(next) = dom::next_sibling_element(*video)
                && is_caption(&next)
            {
                plan.style(next.id(), "display", "none");
            }
        }
    }
}

/// Path portion of a URL, lowercased, without query or fragment.
fn url_path(src: &str) -> String {
    let src = src.to_lowercase();
    let end = src.find(['?', '#']).unwrap_or(src.len());
    src[..end].to_string()
}

fn style_images(doc: &Html, plan: &mut EditPlan, settings: &DisplaySettings) {
    for img in doc.select(&selector("img")) {
        let id = img.id();
        let node = *img;

        let svg_sourced = img
            .value()
            .attr("src")
            .is_some_and(|src| url_path(src).ends_with(".svg"));
        if svg_sourced {
            let target = node
                .parent()
                .filter(|p| dom::element_name(p) == Some("figure"))
                .map(|p| p.id())
                .unwrap_or(id);
            plan.remove(target);
            continue;
        }

        if settings.show_images {
            plan.style_all(
                id,
                &[
                    ("display", "block"),
                    ("max-width", "100%"),
                    ("height", "auto"),
                    ("margin", "1em auto"),
                ],
            );
            plan.set_attr(id, "loading", "lazy");
            // The rendering layer hooks this to hide the element on a
            // load error; no event-handler attribute is ever emitted.
            plan.set_attr(id, "data-hide-on-error", "true");
        } else {
            plan.style(id, "display", "none");
            if let Some(next) = dom::next_sibling_element(node)
                && is_caption(&next)
            {
                plan.style(next.id(), "display", "none");
            }
            if let Some(parent) = node.parent() {
                for sibling in parent.children() {
                    if sibling.id() != id && is_caption(&sibling) {
                        plan.style(sibling.id(), "display", "none");
                    }
                }
            }
        }
    }
}

fn style_figures(doc: &Html, plan: &mut EditPlan) {
    for figure in doc.select(&selector("figure")) {
        plan.style_all(figure.id(), &[("margin", "1.5em 0"), ("text-align", "center")]);
    }
    for caption in doc.select(&selector("figcaption")) {
        plan.style_all(
            caption.id(),
            &[("font-size", "0.85em"), ("color", "#6a737d"), ("margin-top", "0.5em")],
        );
    }
}

fn style_code(doc: &Html, plan: &mut EditPlan) {
    for pre in doc.select(&selector("pre")) {
        plan.style_all(
            pre.id(),
            &[
                ("background", "#f6f8fa"),
                ("padding", "16px"),
                ("border-radius", "6px"),
                ("overflow-x", "auto"),
                ("font-size", "14px"),
                ("line-height", "1.45"),
            ],
        );
    }

    // Inline code only: code under a pre is covered by the block styling.
    for code in doc.select(&selector("code")) {
        let inside_pre = code.ancestors().any(|a| dom::element_name(&a) == Some("pre"));
        if inside_pre {
            continue;
        }
        plan.style_all(
            code.id(),
            &[
                ("background", "rgba(175, 184, 193, 0.2)"),
                ("padding", "0.2em 0.4em"),
                ("border-radius", "6px"),
                ("font-size", "85%"),
            ],
        );
    }
}

fn style_tables(doc: &Html, plan: &mut EditPlan) {
    for table in doc.select(&selector("table")) {
        let id = table.id();
        let already_wrapped = table
            .parent()
            .is_some_and(|p| dom::element_name(&p) == Some("div"));
        if !already_wrapped {
            plan.wrap(
                id,
                "div",
                vec![("style".to_string(), "overflow-x: auto; margin: 1.5em 0".to_string())],
            );
        }
        plan.style_all(id, &[("border-collapse", "collapse"), ("width", "100%")]);
    }

    for cell in doc.select(&selector("th, td")) {
        plan.style_all(
            cell.id(),
            &[("border", "1px solid #d0d7de"), ("padding", "8px 12px")],
        );
    }
    for header in doc.select(&selector("th")) {
        plan.style_all(header.id(), &[("font-weight", "bold"), ("background", "#f8f9fa")]);
    }
}

fn style_blockquotes(doc: &Html, plan: &mut EditPlan) {
    for quote in doc.select(&selector("blockquote")) {
        plan.style_all(
            quote.id(),
            &[
                ("border-left", "4px solid #d0d7de"),
                ("margin", "1.5em 0"),
                ("padding", "0.5em 1em"),
                ("color", "#57606a"),
                ("font-style", "italic"),
            ],
        );
    }
}

fn style_lists(doc: &Html, plan: &mut EditPlan) {
    for list in doc.select(&selector("ul, ol")) {
        let node = *list;
        let Some(tag) = dom::element_name(&node) else {
            continue;
        };
        let depth = node
            .ancestors()
            .filter(|a| matches!(dom::element_name(a), Some("ul") | Some("ol")))
            .count();
        let marker = if tag == "ul" {
            UL_MARKERS[depth % UL_MARKERS.len()]
        } else {
            OL_MARKERS[depth % OL_MARKERS.len()]
        };
        plan.style_all(
            list.id(),
            &[("list-style-type", marker), ("margin", "1em 0"), ("padding-left", "2em")],
        );
    }

    for item in doc.select(&selector("li")) {
        let node = *item;
        let empty = node.children().all(|child| {
            dom::is_whitespace_text(&child)
                || (!child.value().is_element() && !child.value().is_text())
        });
        if empty {
            // Hidden, not removed: an id on the item may be an anchor target.
            plan.style(item.id(), "display", "none");
        } else {
            plan.style(item.id(), "margin", "0.25em 0");
        }
    }
}

/// Slug for heading anchors: lowercase, word characters and spaces only,
/// runs of whitespace collapsed to single hyphens.
fn heading_slug(text: &str) -> String {
    static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
    static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
    let lowered = text.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lowered, "");
    SPACE_RE.replace_all(stripped.trim(), "-").into_owned()
}

fn style_headings(doc: &Html, plan: &mut EditPlan, settings: &DisplaySettings) {
    for (index, tag) in ["h1", "h2", "h3", "h4", "h5", "h6"].iter().enumerate() {
        for heading in doc.select(&selector(tag)) {
            let id = heading.id();
            let size = (f32::from(settings.font_size) * HEADING_SCALE[index]).round() as u32;
            let size_px = format!("{size}px");
            plan.style(id, "font-size", &size_px);
            plan.style_all(
                id,
                &[("font-weight", "600"), ("line-height", "1.25"), ("margin", "1.5em 0 0.5em")],
            );
            if index < 2 {
                plan.style_all(
                    id,
                    &[("border-bottom", "1px solid #d8dee4"), ("padding-bottom", "0.3em")],
                );
            }
            if *tag == "h5" {
                plan.style(id, "text-transform", "uppercase");
            }
            if *tag == "h6" {
                plan.style(id, "color", "#57606a");
            }

            let slug = heading_slug(&heading.text().collect::<String>());
            if !slug.is_empty() {
                plan.set_attr(id, "id", &slug);
            }
        }
    }
}

fn style_paragraphs(doc: &Html, plan: &mut EditPlan, settings: &DisplaySettings) {
    let font_size = format!("{}px", settings.font_size);
    let line_height = settings.line_height.to_string();
    for paragraph in doc.select(&selector("p")) {
        let id = paragraph.id();
        plan.style(id, "font-size", &font_size);
        plan.style(id, "font-family", settings.font_family.as_css());
        plan.style(id, "line-height", &line_height);
        plan.style(id, "text-align", settings.text_align.as_css());
        plan.style(id, "color", "#424750");
        plan.style(id, "margin", "0 0 1em");
    }
}

fn style_links(doc: &Html, plan: &mut EditPlan) {
    for link in doc.select(&selector("a")) {
        let id = link.id();
        plan.style_all(id, &[("color", "#4078c0"), ("text-decoration", "none")]);
        if link.value().attr("href").is_some_and(|h| h.starts_with("http")) {
            plan.set_attr(id, "target", "_blank");
            plan.set_attr(id, "rel", "noopener noreferrer");
        }
    }
}
