//! End-to-end pipeline tests over inline HTML documents.

use legam_core::{
    ContentExtractor, DisplaySettings, ReadabilityExtractor, extract_metadata, normalize_html,
    presanitize,
};
use rstest::rstest;
use scraper::{Html, Selector};

const BASE: &str = "https://example.com/articles/post";

fn settings() -> DisplaySettings {
    DisplaySettings::default()
}

#[test]
fn test_og_title_and_short_excerpt_scenario() {
    let body = r#"<html><head><meta property="og:title" content="Hi &amp; Bye"></head><body><p>Short.</p></body></html>"#;
    let sanitized = presanitize(body, "http://example.com/a");
    let metadata = extract_metadata(&sanitized, "http://example.com/a");
    assert_eq!(metadata.title, "Hi & Bye");
    assert_eq!(metadata.excerpt.as_deref(), Some("Short."));
}

#[test]
fn test_list_repair_invariant() {
    let html = r#"<body>
        <ul><li>A</li><div>stray</div></ul>
        <ol><li>1</li><ol><li>1.1</li></ol></ol>
        <ul><ul><li>orphan</li></ul></ul>
        <ul>   </ul>
        <ul><li>only</li></ul>
    </body>"#;
    let repaired = presanitize(html, BASE);

    let doc = Html::parse_document(&repaired);
    let list_sel = Selector::parse("ul, ol").unwrap();
    for list in doc.select(&list_sel) {
        let mut has_child = false;
        for child in list.children() {
            match child.value() {
                scraper::node::Node::Element(el) => {
                    assert_eq!(el.name(), "li", "direct list child must be an li");
                    has_child = true;
                }
                scraper::node::Node::Text(t) => assert!(t.trim().is_empty()),
                _ => {}
            }
        }
        assert!(has_child, "no empty list survives repair");
    }
}

#[test]
fn test_stray_div_scenario() {
    let repaired = presanitize("<body><ul><li>A</li><div>stray</div></ul></body>", BASE);
    assert!(repaired.contains("<ul><li>A</li><li><div>stray</div></li></ul>"));
}

#[rstest]
#[case::script("<p>a</p><script>document.cookie</script>")]
#[case::style("<p>a</p><style>body { display: none }</style>")]
#[case::form("<p>a</p><form action=\"https://evil.example\"><input name=\"q\"></form>")]
#[case::comment("<p>a</p><!-- hidden payload -->")]
#[case::handler("<p onmouseover=\"steal()\">a</p>")]
#[case::svg("<p>a</p><svg onload=\"x()\"><circle r=\"1\"></circle></svg>")]
fn test_sanitization_soundness(#[case] input: &str) {
    let out = normalize_html(input, &settings());
    assert!(!out.contains("<script"));
    assert!(!out.contains("<style"));
    assert!(!out.contains("<form"));
    assert!(!out.contains("<svg"));
    assert!(!out.contains("<!--"));
    assert!(!out.contains("onmouseover"));
    assert!(!out.contains("onload"));
    assert!(out.contains("a"));
}

#[test]
fn test_sanitization_soundness_survives_presanitize_too() {
    let nasty = r#"<body><script>x</script><p onclick="y()">text</p><!-- c --></body>"#;
    let out = presanitize(nasty, BASE);
    assert!(!out.contains("<script"));
    assert!(!out.contains("<!--"));
}

#[test]
fn test_url_absolutization_property() {
    let html = r##"<body>
        <img src="pics/a.png">
        <img src="/abs/b.png">
        <a href="relative/page">r</a>
        <a href="#frag">f</a>
        <a href="mailto:x@y.z">m</a>
    </body>"##;
    let out = presanitize(html, BASE);

    let doc = Html::parse_document(&out);
    let img_sel = Selector::parse("img").unwrap();
    for img in doc.select(&img_sel) {
        let src = img.value().attr("src").unwrap();
        assert!(src.starts_with("https://"), "img src not absolute: {src}");
    }
    let a_sel = Selector::parse("a").unwrap();
    for a in doc.select(&a_sel) {
        let href = a.value().attr("href").unwrap();
        assert!(
            href.starts_with("https://") || href.starts_with('#') || href.starts_with("mailto:"),
            "href neither absolute nor fragment nor mailto: {href}"
        );
    }
}

#[test]
fn test_excerpt_bound_property() {
    let long = "word ".repeat(80);
    let html = format!(r#"<meta name="description" content="{long}">"#);
    let excerpt = extract_metadata(&html, BASE).excerpt.unwrap();
    assert!(excerpt.chars().count() <= 150);
    assert!(excerpt.ends_with("..."));

    let short_html = r#"<meta name="description" content="Fits fine.">"#;
    assert_eq!(extract_metadata(short_html, BASE).excerpt.as_deref(), Some("Fits fine."));
}

#[test]
fn test_youtube_embed_scenario_visible_and_hidden() {
    let html = r#"<iframe src="http://www.youtube.com/embed/xyz"></iframe>"#;

    let visible = normalize_html(html, &settings());
    assert!(visible.contains(r#"src="https://www.youtube.com/embed/xyz""#));
    assert!(visible.contains(r#"class="video-container""#));
    assert!(visible.contains("padding-bottom: 56.25%"));
    assert!(!visible.contains("display: none"));

    let mut hidden_settings = settings();
    hidden_settings.show_videos = false;
    let hidden = normalize_html(html, &hidden_settings);
    assert!(hidden.contains(r#"class="video-container""#));
    assert!(hidden.contains("display: none"));
}

#[test]
fn test_heading_slug_scenario() {
    let out = normalize_html("<h2>Some Title!</h2>", &settings());
    assert!(out.contains(r#"id="some-title""#));
}

#[test]
fn test_normalize_idempotent_on_own_output() {
    let html = r#"
        <h1>The Piece</h1>
        <p>Intro &amp; context.</p>
        <ul><li>one</li><li>two<ul><li>deep</li></ul></li></ul>
        <blockquote>quoted</blockquote>
        <pre><code>let x = 1;</code></pre>
        <table><tbody><tr><th>k</th><td>v</td></tr></tbody></table>
        <img src="https://example.com/a.png" alt="a">
        <a href="https://example.com/next">next</a>
    "#;
    let s = settings();
    let once = normalize_html(html, &s);
    let twice = normalize_html(&once, &s);
    let thrice = normalize_html(&twice, &s);
    assert_eq!(twice, thrice, "normalization must converge on its own output");
}

#[test]
fn test_full_pipeline_fetchless() {
    let paragraphs: String = (0..10)
        .map(|i| {
            format!(
                "<p>Paragraph {i}: a long stretch of article prose carrying enough \
                 weight that content extraction keeps it as part of the main body \
                 instead of discarding it as navigation or boilerplate.</p>"
            )
        })
        .collect();
    let page = format!(
        r#"<html><head>
        <title>Pipeline Article</title>
        <meta property="og:description" content="An end to end run.">
        </head><body>
        <nav><ul><li><a href="/home">Home</a></li></ul></nav>
        <article><h1>Pipeline Article</h1>{paragraphs}</article>
        <script>track()</script>
        </body></html>"#
    );

    let sanitized = presanitize(&page, BASE);
    assert!(!sanitized.contains("<script"));

    let metadata = extract_metadata(&sanitized, BASE);
    assert_eq!(metadata.title, "Pipeline Article");
    assert_eq!(metadata.excerpt.as_deref(), Some("An end to end run."));
    assert!(!metadata.has_video);

    let extractor = ReadabilityExtractor::new();
    let article = extractor.extract(&sanitized, Some(BASE)).expect("extraction should succeed");
    assert!(article.content_html.contains("Paragraph 5"));

    let rendered = normalize_html(&article.content_html, &settings());
    assert!(rendered.contains("font-size: 18px"));
    assert!(rendered.contains("Paragraph 5"));
}
