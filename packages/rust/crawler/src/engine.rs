//! Budgeted breadth-first crawl shared by every source kind.
//!
//! [`CrawlStrategy`] owns the queue, dedup, filtering, progress and
//! cancellation. A [`Discoverer`] supplies the per-source part: turning one
//! queue item into an optional document plus candidate links.
//!
//! All mutable crawl state lives in a [`CrawlContext`] created per call to
//! `scrape`, so one strategy value never leaks state between jobs.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use url::Url;

use docscout_shared::{
    CancellationToken, QueueItem, Result, ScraperError, ScraperOptions, ScraperProgressEvent,
};

use crate::scope::{PatternFilter, is_subpage, normalize_url};
use crate::strategy::{ProcessItemResult, ProgressCallback, ScraperStrategy, SourceKind};

// ---------------------------------------------------------------------------
// Discoverer
// ---------------------------------------------------------------------------

/// Per-source link discovery plugged into the crawl engine.
#[async_trait]
pub trait Discoverer: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn can_handle(&self, url: &str) -> bool;

    /// Fetch and extract one item. Errors at depth 0 abort the job.
    async fn process_item(
        &self,
        item: &QueueItem,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<ProcessItemResult>;

    /// Whether a discovered link belongs to this job at all.
    fn is_in_scope(&self, seed: &Url, link: &Url, options: &ScraperOptions) -> bool {
        !options.subpages_only || is_subpage(seed, link)
    }

    /// String that include/exclude patterns are matched against.
    ///
    /// `None` exempts the link from pattern filtering (containers such as
    /// directories that must be entered to reach matching files).
    fn filter_target(&self, _seed: &Url, link: &Url) -> Option<String> {
        Some(link.path().to_string())
    }

    /// Dedup key for a URL.
    fn normalize(&self, url: &str) -> String {
        normalize_url(url)
    }

    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CrawlContext
// ---------------------------------------------------------------------------

/// Mutable state of one crawl job.
struct CrawlContext {
    seed: Url,
    filter: PatternFilter,
    queue: VecDeque<QueueItem>,
    /// Normalized URLs already handed to the discoverer.
    visited: HashSet<String>,
    /// Normalized URLs ever enqueued, seed included.
    discovered: HashSet<String>,
    pages_scraped: usize,
    signal: CancellationToken,
}

impl CrawlContext {
    fn new(options: &ScraperOptions, seed_key: String, signal: CancellationToken) -> Result<Self> {
        let seed = Url::parse(&options.url)
            .map_err(|e| ScraperError::invalid_url(&options.url, e.to_string()))?;
        let filter = PatternFilter::new(&options.include_patterns, &options.exclude_patterns)?;

        let mut queue = VecDeque::new();
        queue.push_back(QueueItem::new(options.url.clone(), 0));
        let mut discovered = HashSet::new();
        discovered.insert(seed_key);

        Ok(Self {
            seed,
            filter,
            queue,
            visited: HashSet::new(),
            discovered,
            pages_scraped: 0,
            signal,
        })
    }

    /// Pop up to `size` unvisited items, marking them visited.
    fn next_batch<D: Discoverer + ?Sized>(&mut self, discoverer: &D, size: usize) -> Vec<QueueItem> {
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            let Some(item) = self.queue.pop_front() else {
                break;
            };
            if self.visited.insert(discoverer.normalize(&item.url)) {
                batch.push(item);
            }
        }
        batch
    }
}

// ---------------------------------------------------------------------------
// CrawlStrategy
// ---------------------------------------------------------------------------

/// A [`ScraperStrategy`] that runs the generic crawl over a [`Discoverer`].
pub struct CrawlStrategy<D> {
    discoverer: D,
}

impl<D: Discoverer> CrawlStrategy<D> {
    pub fn new(discoverer: D) -> Self {
        Self { discoverer }
    }

    #[instrument(skip_all, fields(url = %options.url, kind = %self.discoverer.kind()))]
    async fn run(
        &self,
        options: &ScraperOptions,
        progress: &dyn ProgressCallback,
        signal: CancellationToken,
    ) -> Result<()> {
        let seed_key = self.discoverer.normalize(&options.url);
        let mut ctx = CrawlContext::new(options, seed_key, signal)?;
        let batch_limit = options.max_concurrency.max(1);

        info!(
            max_pages = options.max_pages,
            max_depth = options.max_depth,
            "starting crawl"
        );

        while !ctx.queue.is_empty() && ctx.pages_scraped < options.max_pages {
            if ctx.signal.is_cancelled() {
                info!(pages_scraped = ctx.pages_scraped, "crawl cancelled");
                return Ok(());
            }

            let remaining = options.max_pages - ctx.pages_scraped;
            let batch = ctx.next_batch(&self.discoverer, batch_limit.min(remaining));
            if batch.is_empty() {
                continue;
            }

            let results = join_all(
                batch
                    .iter()
                    .map(|item| self.discoverer.process_item(item, options, &ctx.signal)),
            )
            .await;

            for (item, result) in batch.into_iter().zip(results) {
                if ctx.signal.is_cancelled() {
                    info!(pages_scraped = ctx.pages_scraped, "crawl cancelled");
                    return Ok(());
                }

                let result = match result {
                    Ok(result) => result,
                    Err(e) if e.is_cancelled() => {
                        info!(pages_scraped = ctx.pages_scraped, "crawl cancelled");
                        return Ok(());
                    }
                    Err(e) if item.depth > 0 && options.ignore_errors => {
                        warn!(url = %item.url, depth = item.depth, error = %e, "failed to process item, skipping");
                        ProcessItemResult::default()
                    }
                    Err(e) => return Err(e),
                };

                ctx.pages_scraped += 1;
                self.enqueue_links(&mut ctx, &item, &result.links, options);

                let total_discovered = ctx.discovered.len();
                debug!(
                    url = %item.url,
                    depth = item.depth,
                    pages_scraped = ctx.pages_scraped,
                    has_document = result.document.is_some(),
                    "item processed"
                );

                progress
                    .on_progress(ScraperProgressEvent {
                        current_url: item.url,
                        pages_scraped: ctx.pages_scraped,
                        max_pages: options.max_pages,
                        total_pages: total_discovered.min(options.max_pages),
                        total_discovered,
                        depth: item.depth,
                        max_depth: options.max_depth,
                        document: result.document,
                    })
                    .await?;
            }
        }

        info!(
            pages_scraped = ctx.pages_scraped,
            discovered = ctx.discovered.len(),
            "crawl completed"
        );
        Ok(())
    }

    fn enqueue_links(
        &self,
        ctx: &mut CrawlContext,
        item: &QueueItem,
        links: &[String],
        options: &ScraperOptions,
    ) {
        let depth = item.depth + 1;
        if depth > options.max_depth {
            return;
        }

        for link in links {
            let Ok(link_url) = Url::parse(link) else {
                debug!(%link, "unparseable link skipped");
                continue;
            };
            let key = self.discoverer.normalize(link);
            if ctx.visited.contains(&key) || ctx.discovered.contains(&key) {
                continue;
            }
            if !self.discoverer.is_in_scope(&ctx.seed, &link_url, options) {
                continue;
            }
            if let Some(target) = self.discoverer.filter_target(&ctx.seed, &link_url) {
                let candidates = [
                    target.as_str(),
                    target.trim_start_matches('/'),
                    link.as_str(),
                ];
                if !ctx.filter.allows(&candidates) {
                    debug!(%link, "filtered by include/exclude patterns");
                    continue;
                }
            }

            ctx.discovered.insert(key);
            ctx.queue.push_back(QueueItem::new(link.clone(), depth));
        }
    }
}

#[async_trait]
impl<D: Discoverer> ScraperStrategy for CrawlStrategy<D> {
    fn kind(&self) -> SourceKind {
        self.discoverer.kind()
    }

    fn can_handle(&self, url: &str) -> bool {
        self.discoverer.can_handle(url)
    }

    async fn scrape(
        &self,
        options: &ScraperOptions,
        progress: &dyn ProgressCallback,
        signal: Option<CancellationToken>,
    ) -> Result<()> {
        let signal = signal
            .or_else(|| options.signal.clone())
            .unwrap_or_default();
        self.run(options, progress, signal).await
    }

    async fn cleanup(&self) -> Result<()> {
        self.discoverer.cleanup().await
    }
}
