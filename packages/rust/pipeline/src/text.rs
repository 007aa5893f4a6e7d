//! JSON and plain-text/source-code pipelines.

use docscout_shared::{RawContent, Result};

use crate::{ContentPipeline, ProcessedContent, looks_binary};

/// Non-`text/*` mime types that are still human-readable source.
const TEXTUAL_APPLICATION_TYPES: &[&str] = &[
    "application/javascript",
    "application/typescript",
    "application/xml",
    "application/toml",
    "application/yaml",
    "application/x-yaml",
    "application/x-sh",
    "application/x-httpd-php",
    "application/sql",
];

/// Pretty-prints JSON documents; invalid JSON is reported, not fatal.
pub struct JsonPipeline;

impl ContentPipeline for JsonPipeline {
    fn can_process(&self, raw: &RawContent) -> bool {
        let essence = raw.essence();
        (essence == "application/json" || essence.ends_with("+json")) && !looks_binary(&raw.content)
    }

    fn process(&self, raw: &RawContent) -> Result<ProcessedContent> {
        let text = raw.text();
        let mut errors = Vec::new();

        let text_content = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(text),
            Err(e) => {
                errors.push(format!("invalid JSON in {}: {e}", raw.source));
                text
            }
        };

        Ok(ProcessedContent {
            text_content,
            title: None,
            links: Vec::new(),
            errors,
        })
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Accepts any remaining textual content (prose, source code, configs) as-is.
pub struct TextPipeline;

impl ContentPipeline for TextPipeline {
    fn can_process(&self, raw: &RawContent) -> bool {
        let essence = raw.essence();
        (essence.starts_with("text/") || TEXTUAL_APPLICATION_TYPES.contains(&essence.as_str()))
            && !looks_binary(&raw.content)
    }

    fn process(&self, raw: &RawContent) -> Result<ProcessedContent> {
        let text_content = raw.text();
        let mut errors = Vec::new();
        if text_content.trim().is_empty() {
            errors.push(format!("empty file: {}", raw.source));
        }

        Ok(ProcessedContent {
            text_content,
            title: None,
            links: Vec::new(),
            errors,
        })
    }

    fn name(&self) -> &str {
        "text"
    }
}
