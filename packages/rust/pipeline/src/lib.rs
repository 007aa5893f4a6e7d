//! Content pipelines: decide whether and how raw bytes become document text.
//!
//! Pipelines are tried in registration order; the first whose
//! [`ContentPipeline::can_process`] accepts the content handles it.
//! [`PipelineRegistry::new`] registers HTML, Markdown, JSON, then plain text.

mod html;
mod markdown;
mod text;

use docscout_shared::{RawContent, Result};

pub use html::HtmlPipeline;
pub use markdown::MarkdownPipeline;
pub use text::{JsonPipeline, TextPipeline};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Output of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ProcessedContent {
    /// Extracted text (Markdown for HTML input).
    pub text_content: String,
    /// Title found in the content, if any.
    pub title: Option<String>,
    /// Absolute links found in the content (HTML only).
    pub links: Vec<String>,
    /// Non-fatal problems. A non-empty list means the document is unusable.
    pub errors: Vec<String>,
}

/// One way of turning raw content into text.
pub trait ContentPipeline: Send + Sync {
    /// Whether this pipeline accepts the content (by mime type and shape).
    fn can_process(&self, raw: &RawContent) -> bool;

    /// Extract text, title and links.
    fn process(&self, raw: &RawContent) -> Result<ProcessedContent>;

    /// Human-readable pipeline name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered pipelines in priority order.
pub struct PipelineRegistry {
    pipelines: Vec<Box<dyn ContentPipeline>>,
}

impl PipelineRegistry {
    /// Create a registry with all built-in pipelines (structured formats first, plain text last).
    pub fn new() -> Self {
        Self {
            pipelines: vec![
                Box::new(HtmlPipeline),
                Box::new(MarkdownPipeline),
                Box::new(JsonPipeline),
                Box::new(TextPipeline),
            ],
        }
    }

    /// The first pipeline that accepts `raw`, or `None` when nothing does.
    pub fn select(&self, raw: &RawContent) -> Option<&dyn ContentPipeline> {
        self.pipelines
            .iter()
            .find(|p| p.can_process(raw))
            .map(|p| p.as_ref())
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Heuristic binary sniff: NUL bytes in the first 8 KiB.
pub(crate) fn looks_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}
