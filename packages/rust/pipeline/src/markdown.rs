//! Markdown pipeline: content passes through, title from the first H1.

use std::sync::LazyLock;

use regex::Regex;

use docscout_shared::{RawContent, Result};

use crate::{ContentPipeline, ProcessedContent, looks_binary};

pub struct MarkdownPipeline;

impl ContentPipeline for MarkdownPipeline {
    fn can_process(&self, raw: &RawContent) -> bool {
        matches!(
            raw.essence().as_str(),
            "text/markdown" | "text/x-markdown" | "text/mdx"
        ) && !looks_binary(&raw.content)
    }

    fn process(&self, raw: &RawContent) -> Result<ProcessedContent> {
        let text = strip_frontmatter(&raw.text());
        let title = extract_title(&text);

        let mut errors = Vec::new();
        if text.trim().is_empty() {
            errors.push(format!("empty markdown document: {}", raw.source));
        }

        Ok(ProcessedContent {
            text_content: text,
            title,
            links: Vec::new(),
            errors,
        })
    }

    fn name(&self) -> &str {
        "markdown"
    }
}

/// Extract title from the first H1 in the Markdown text.
fn extract_title(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

/// Drop a leading YAML frontmatter block.
fn strip_frontmatter(md: &str) -> String {
    static FM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\A---\r?\n.*?\r?\n---\r?\n").expect("valid regex"));

    FM_RE.replace(md, "").into_owned()
}
