//! HTML pipeline: main-content extraction, Markdown conversion, link harvesting.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use docscout_shared::{RawContent, Result, ScraperError};

use crate::{ContentPipeline, ProcessedContent};

/// Containers tried in order when locating the main content.
const CONTENT_SELECTORS: &[&str] = &[
    "article .markdown",
    ".vp-doc",
    ".markdown-section",
    "#wiki-body",
    ".markdown-body",
    r#"[role="main"]"#,
    "article",
    "main",
    ".content",
];

/// Navigation and page chrome removed before conversion.
const CHROME_SELECTOR: &str =
    "nav, header, footer, aside, script, style, noscript, iframe, svg, .sidebar, .nav";

/// Converts HTML pages to Markdown.
pub struct HtmlPipeline;

impl ContentPipeline for HtmlPipeline {
    fn can_process(&self, raw: &RawContent) -> bool {
        matches!(raw.essence().as_str(), "text/html" | "application/xhtml+xml")
    }

    fn process(&self, raw: &RawContent) -> Result<ProcessedContent> {
        let html = raw.text();
        let doc = Html::parse_document(&html);
        let base = Url::parse(&raw.source).ok();

        let title = extract_title(&doc);
        let links = base
            .as_ref()
            .map(|b| extract_links(&doc, b))
            .unwrap_or_default();

        let content_html = strip_chrome(&extract_content_html(&doc));
        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
            .build();
        let markdown = converter
            .convert(&content_html)
            .map_err(|e| ScraperError::Conversion(format!("htmd conversion failed: {e}")))?;
        let text_content = clean_blank_lines(&markdown);

        debug!(
            url = %raw.source,
            links = links.len(),
            len = text_content.len(),
            "html converted"
        );

        let mut errors = Vec::new();
        if text_content.trim().is_empty() {
            errors.push(format!("no extractable content in {}", raw.source));
        }

        Ok(ProcessedContent {
            text_content,
            title,
            links,
            errors,
        })
    }

    fn name(&self) -> &str {
        "html"
    }
}

/// `<title>` text, falling back to the first `<h1>`.
fn extract_title(doc: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|s| {
        let sel = Selector::parse(s).ok()?;
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Extract all links from a document, resolved against the base URL.
fn extract_links(doc: &Html, base_url: &Url) -> Vec<String> {
    let Ok(link_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        if let Some(href) = el.value().attr("href") {
            // Skip anchors, javascript:, mailto:
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
            {
                continue;
            }

            if let Ok(mut resolved) = base_url.join(href) {
                resolved.set_fragment(None);
                let resolved = resolved.to_string();
                if !links.contains(&resolved) {
                    links.push(resolved);
                }
            }
        }
    }

    links
}

fn extract_content_html(doc: &Html) -> String {
    for sel_str in CONTENT_SELECTORS {
        if let Ok(sel) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&sel).next() {
                return el.inner_html();
            }
        }
    }

    Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next().map(|b| b.inner_html()))
        .unwrap_or_else(|| doc.root_element().inner_html())
}

/// Strip common navigation/chrome elements from HTML content.
fn strip_chrome(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let Ok(chrome_sel) = Selector::parse(CHROME_SELECTOR) else {
        return html.to_string();
    };

    let mut result = html.to_string();
    for el in fragment.select(&chrome_sel) {
        result = result.replace(&el.html(), "");
    }
    result
}

/// Collapse runs of blank lines and trim trailing whitespace.
fn clean_blank_lines(md: &str) -> String {
    static BLANKS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed: Vec<&str> = md.lines().map(str::trim_end).collect();
    let joined = trimmed.join("\n");
    let mut out = BLANKS.replace_all(joined.trim(), "\n\n").into_owned();
    out.push('\n');
    out
}
