//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("legam").unwrap()
}

fn article_html() -> String {
    let paragraphs: String = (0..8)
        .map(|i| {
            format!(
                "<p>Paragraph {i} of a long-form piece with enough running prose \
                 that the content extractor treats it as the main article body \
                 rather than incidental page furniture.</p>"
            )
        })
        .collect();
    format!(
        r#"<html><head>
        <title>Fixture Article</title>
        <meta property="og:description" content="A fixture for CLI runs.">
        </head><body>
        <article><h1>Fixture Article</h1>{paragraphs}</article>
        <script>track()</script>
        </body></html>"#
    )
}

#[test]
fn test_cli_stdin_input() {
    cmd()
        .arg("-")
        .write_stdin(article_html())
        .assert()
        .success()
        .stdout(predicate::str::contains("Paragraph 3"))
        .stdout(predicate::str::contains("font-size: 18px"))
        .stdout(predicate::str::contains("script").not());
}

#[test]
fn test_cli_file_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("article.html");
    std::fs::write(&path, article_html()).unwrap();

    cmd()
        .arg(path.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Paragraph 3"));
}

#[test]
fn test_cli_output_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("article.html");
    let output = dir.path().join("out.html");
    std::fs::write(&input, article_html()).unwrap();

    cmd()
        .args([input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("Paragraph 3"));
}

#[test]
fn test_cli_metadata_only() {
    cmd()
        .args(["-", "--metadata-only"])
        .write_stdin(article_html())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"Fixture Article\""))
        .stdout(predicate::str::contains("\"has_video\": false"));
}

#[test]
fn test_cli_typography_flags() {
    cmd()
        .args(["-", "--font-size", "24", "--text-align", "justify"])
        .write_stdin(article_html())
        .assert()
        .success()
        .stdout(predicate::str::contains("font-size: 24px"))
        .stdout(predicate::str::contains("text-align: justify"));
}

#[test]
fn test_cli_rejects_out_of_range_settings() {
    cmd()
        .args(["-", "--font-size", "99"])
        .write_stdin(article_html())
        .assert()
        .failure()
        .stderr(predicate::str::contains("fontSize"));
}

#[test]
fn test_cli_rejects_bad_alignment() {
    cmd()
        .args(["-", "--text-align", "diagonal"])
        .write_stdin(article_html())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid alignment"));
}

#[test]
fn test_cli_invalid_url_fails_without_network() {
    cmd()
        .arg("http://")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch URL"));
}

#[test]
fn test_cli_missing_file_fails() {
    cmd()
        .arg("/nonexistent/page.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}
