use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use legam_core::{
    DisplaySettings, FetchConfig, FontFamily, ReadabilityExtractor, Reader, TextAlign,
    extract_metadata, fetch_url, normalize_html, presanitize,
};
use owo_colors::OwoColorize;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text alignment choice on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AlignArg(TextAlign);

impl FromStr for AlignArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Self(TextAlign::Left)),
            "center" => Ok(Self(TextAlign::Center)),
            "right" => Ok(Self(TextAlign::Right)),
            "justify" => Ok(Self(TextAlign::Justify)),
            _ => Err(format!("Invalid alignment: {}. Valid options: left, center, right, justify", s)),
        }
    }
}

/// Font family choice on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FontArg(FontFamily);

impl FromStr for FontArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serif" | "pt-serif" => Ok(Self(FontFamily::PtSerif)),
            "sans" | "pt-sans" => Ok(Self(FontFamily::PtSans)),
            _ => Err(format!("Invalid font family: {}. Valid options: serif, sans", s)),
        }
    }
}

/// Fetch a web article, extract its main content, and emit reader-ready HTML
#[derive(Parser, Debug)]
#[command(name = "legam")]
#[command(author = "Legam Contributors")]
#[command(version = VERSION)]
#[command(about = "Fetch and normalize web articles for reading", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print extracted metadata as JSON instead of normalized HTML
    #[arg(long)]
    metadata_only: bool,

    /// Base URL for resolving relative links in file/stdin input
    #[arg(long, default_value = "https://localhost/", value_name = "URL")]
    base_url: String,

    /// Body font size in px (10-30)
    #[arg(long, default_value = "18", value_name = "PX")]
    font_size: u8,

    /// Body line height (1.0-3.0)
    #[arg(long, default_value = "1.6", value_name = "NUM")]
    line_height: f32,

    /// Text alignment (left, center, right, justify)
    #[arg(long, default_value = "left", value_name = "ALIGN")]
    text_align: AlignArg,

    /// Font family (serif, sans)
    #[arg(long, default_value = "serif", value_name = "FAMILY")]
    font_family: FontArg,

    /// Hide images in the output
    #[arg(long)]
    no_images: bool,

    /// Hide video embeds in the output
    #[arg(long)]
    no_videos: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "20", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Enable progress output
    #[arg(short, long)]
    verbose: bool,
}

/// Print a styled banner for verbose mode
fn print_banner() {
    eprintln!("\n{} {} {}", "Legam".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Fetch and normalize web articles for reading".dimmed());
    eprintln!();
}

/// Print a styled step message
fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        print_banner();
    }

    let settings = DisplaySettings {
        font_size: args.font_size,
        font_family: args.font_family.0,
        line_height: args.line_height,
        text_align: args.text_align.0,
        show_images: !args.no_images,
        show_videos: !args.no_videos,
    };
    if let Err(reason) = settings.validate() {
        anyhow::bail!("invalid display settings: {reason}");
    }

    let (html, page_url) = if args.input == "-" {
        if args.verbose {
            print_step(1, 4, "Reading from stdin");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        (buffer, args.base_url.clone())
    } else if args.input.starts_with("http://") || args.input.starts_with("https://") {
        if args.verbose {
            print_step(1, 4, &format!("Fetching {}", args.input.bright_white().underline()));
        }
        let mut config = FetchConfig { timeout: args.timeout, ..Default::default() };
        if let Some(ua) = &args.user_agent {
            config.user_agent = ua.clone();
        }
        let raw = fetch_url(&args.input, &config).await.context("Failed to fetch URL")?;
        let final_url = raw.url.to_string();
        (raw.html, final_url)
    } else {
        if args.verbose {
            print_step(1, 4, &format!("Reading file {}", args.input.bright_white()));
        }
        let content = fs::read_to_string(&args.input)
            .with_context(|| format!("Failed to read file: {}", args.input))?;
        (content, args.base_url.clone())
    };

    if args.verbose {
        print_step(2, 4, "Pre-sanitizing document");
    }
    let sanitized = presanitize(&html, &page_url);
    let metadata = extract_metadata(&sanitized, &page_url);

    if args.verbose {
        eprintln!("  {} {}", "Title:".dimmed(), metadata.title.bright_white());
        if let Some(site) = &metadata.site_name {
            eprintln!("  {} {}", "Site:".dimmed(), site.bright_white());
        }
    }

    let output = if args.metadata_only {
        serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?
    } else {
        if args.verbose {
            print_step(3, 4, "Extracting main content");
        }
        let reader = Reader::new().with_extractor(Box::new(ReadabilityExtractor::new()));
        let article =
            reader.extract(&sanitized, &page_url).context("Failed to extract article content")?;

        if args.verbose {
            print_step(4, 4, "Normalizing for display");
        }
        normalize_html(&article.content_html, &settings)
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            if args.verbose {
                eprintln!("{} {}", "✓".green(), format!("Wrote {}", path.display()).bright_green());
            }
        }
        None => println!("{}", output),
    }

    Ok(())
}
