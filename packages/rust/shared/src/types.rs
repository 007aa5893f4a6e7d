//! Core domain types shared by fetchers, pipelines and the crawl engine.
//!
//! Every value here lives for exactly one scrape job.

use std::collections::HashMap;

use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// QueueItem
// ---------------------------------------------------------------------------

/// One entry in the crawl frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub url: String,
    /// Distance from the seed URL (seed = 0).
    pub depth: usize,
}

impl QueueItem {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

// ---------------------------------------------------------------------------
// ScraperOptions
// ---------------------------------------------------------------------------

/// Host restriction applied to discovered web links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeScope {
    /// Same host and under the seed's path.
    Subpages,
    /// Same host, any path.
    #[default]
    Hostname,
    /// Same registrable domain (subdomains allowed).
    Domain,
}

/// Parameters for a single scrape job.
#[derive(Debug, Clone)]
pub struct ScraperOptions {
    /// Seed URL.
    pub url: String,
    /// Library name recorded on every produced document.
    pub library: String,
    /// Library version recorded on every produced document.
    pub version: String,
    /// Page budget. A job never processes more items than this.
    pub max_pages: usize,
    /// Maximum link depth from the seed.
    pub max_depth: usize,
    /// Sibling items fetched concurrently per batch.
    pub max_concurrency: usize,
    /// Only follow links nested under the seed URL's path.
    pub subpages_only: bool,
    pub scope: ScrapeScope,
    pub follow_redirects: bool,
    /// Log and skip failures of non-seed items instead of aborting.
    pub ignore_errors: bool,
    /// Glob (or `/regex/`) patterns; when non-empty a link must match one.
    pub include_patterns: Vec<String>,
    /// Glob (or `/regex/`) patterns; a link matching any is dropped.
    pub exclude_patterns: Vec<String>,
    /// Extra request headers forwarded verbatim (e.g. `Authorization`).
    pub headers: HashMap<String, String>,
    pub signal: Option<CancellationToken>,
}

impl ScraperOptions {
    /// Options for `url` with library defaults and no configuration file.
    pub fn new(url: impl Into<String>, library: impl Into<String>, version: impl Into<String>) -> Self {
        Self::from_config(url, library, version, &AppConfig::default())
    }

    /// Options for `url` with budgets taken from the application config.
    pub fn from_config(
        url: impl Into<String>,
        library: impl Into<String>,
        version: impl Into<String>,
        config: &AppConfig,
    ) -> Self {
        Self {
            url: url.into(),
            library: library.into(),
            version: version.into(),
            max_pages: config.scraper.max_pages,
            max_depth: config.scraper.max_depth,
            max_concurrency: config.scraper.max_concurrency,
            subpages_only: true,
            scope: ScrapeScope::default(),
            follow_redirects: true,
            ignore_errors: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            headers: HashMap::new(),
            signal: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Metadata attached to every produced document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub url: String,
    pub title: String,
    pub library: String,
    pub version: String,
    /// Depth at which the document was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
    /// Source-relative path (repository path, archive entry, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Extracted text handed to the ingestion sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub metadata: DocumentMetadata,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Emitted once per processed queue item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScraperProgressEvent {
    pub current_url: String,
    /// Items processed so far in this job. Never decreases.
    pub pages_scraped: usize,
    pub max_pages: usize,
    /// `min(total_discovered, max_pages)`.
    pub total_pages: usize,
    /// Unique URLs seen so far, including the seed.
    pub total_discovered: usize,
    pub depth: usize,
    pub max_depth: usize,
    /// Present only when extraction produced a document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

// ---------------------------------------------------------------------------
// RawContent
// ---------------------------------------------------------------------------

/// Outcome of a fetch that did not fail at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStatus {
    Success,
    NotFound,
    Error,
}

/// Bytes returned by a fetcher plus what is known about them.
#[derive(Debug, Clone)]
pub struct RawContent {
    pub content: Vec<u8>,
    pub mime_type: String,
    /// Final URL after redirects (or the requested URL).
    pub source: String,
    pub charset: Option<String>,
    pub status: FetchStatus,
}

impl RawContent {
    /// A `NOT_FOUND` result for `source` with no body.
    pub fn not_found(source: impl Into<String>) -> Self {
        Self {
            content: Vec::new(),
            mime_type: String::new(),
            source: source.into(),
            charset: None,
            status: FetchStatus::NotFound,
        }
    }

    /// Body decoded with the declared charset, UTF-8 when none is known.
    ///
    /// A byte order mark overrides the declared charset. Invalid sequences are
    /// replaced rather than rejected.
    pub fn text(&self) -> String {
        let encoding = self
            .charset
            .as_deref()
            .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.content);
        text.into_owned()
    }

    /// Mime type without parameters, lowercased.
    pub fn essence(&self) -> String {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }
}
