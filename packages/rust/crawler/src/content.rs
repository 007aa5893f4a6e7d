//! Raw content to [`Document`] through the first accepting pipeline.

use tracing::{debug, warn};

use docscout_pipeline::PipelineRegistry;
use docscout_shared::{Document, DocumentMetadata, QueueItem, RawContent, ScraperOptions};

/// Result of running the pipelines over one fetched item.
#[derive(Debug, Default)]
pub(crate) struct Extracted {
    pub document: Option<Document>,
    pub links: Vec<String>,
}

/// Run `raw` through the first pipeline that accepts it.
///
/// Unsupported content, pipeline failures and reported extraction errors skip
/// the item with a warning; none of them abort the crawl.
pub(crate) fn extract_document(
    pipelines: &PipelineRegistry,
    raw: &RawContent,
    url: &str,
    item: &QueueItem,
    options: &ScraperOptions,
    path: Option<String>,
) -> Extracted {
    let Some(pipeline) = pipelines.select(raw) else {
        warn!(%url, mime = %raw.mime_type, "no pipeline accepts content, skipping");
        return Extracted::default();
    };

    let processed = match pipeline.process(raw) {
        Ok(processed) => processed,
        Err(e) => {
            warn!(%url, pipeline = pipeline.name(), error = %e, "pipeline failed, skipping");
            return Extracted::default();
        }
    };

    if !processed.errors.is_empty() {
        warn!(
            %url,
            pipeline = pipeline.name(),
            errors = ?processed.errors,
            "extraction reported errors, skipping document"
        );
        return Extracted {
            document: None,
            links: processed.links,
        };
    }

    let content_type = if pipeline.name() == "html" {
        "text/markdown".to_string()
    } else {
        raw.essence()
    };
    let title = processed
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| fallback_title(url));

    debug!(%url, pipeline = pipeline.name(), %title, "document extracted");

    Extracted {
        document: Some(Document {
            content: processed.text_content,
            content_type: Some(content_type),
            metadata: DocumentMetadata {
                url: url.to_string(),
                title,
                library: options.library.clone(),
                version: options.version.clone(),
                level: Some(item.depth),
                path,
            },
        }),
        links: processed.links,
    }
}

/// Last non-empty path segment, or the whole URL.
fn fallback_title(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(url)
        .to_string()
}
