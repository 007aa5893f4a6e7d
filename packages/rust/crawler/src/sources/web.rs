//! Generic web sites: fetch over HTTP, follow links found in HTML.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use docscout_fetcher::{ContentFetcher, FetchOptions, HttpFetcher};
use docscout_pipeline::PipelineRegistry;
use docscout_shared::{
    AppConfig, CancellationToken, FetchStatus, QueueItem, Result, ScraperOptions,
};

use crate::content::extract_document;
use crate::engine::Discoverer;
use crate::scope::{in_host_scope, is_subpage};
use crate::strategy::{ProcessItemResult, SourceKind};

pub struct WebDiscoverer {
    fetcher: HttpFetcher,
    pipelines: PipelineRegistry,
}

impl WebDiscoverer {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(&config.scraper)?,
            pipelines: PipelineRegistry::new(),
        })
    }

    /// Fetch one page and extract its document and links.
    pub(crate) async fn fetch_page(
        &self,
        item: &QueueItem,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<WebPage> {
        let fetch_options = FetchOptions {
            headers: options.headers.clone(),
            signal: Some(signal.clone()),
            follow_redirects: options.follow_redirects,
        };
        let raw = self.fetcher.fetch(&item.url, &fetch_options).await?;
        if raw.status != FetchStatus::Success {
            debug!(url = %item.url, status = ?raw.status, "page not available");
            return Ok(WebPage {
                result: ProcessItemResult {
                    status: raw.status,
                    ..ProcessItemResult::default()
                },
                final_url: raw.source,
            });
        }

        let extracted = extract_document(&self.pipelines, &raw, &raw.source, item, options, None);
        Ok(WebPage {
            result: ProcessItemResult {
                document: extracted.document,
                links: extracted.links,
                status: FetchStatus::Success,
            },
            final_url: raw.source,
        })
    }
}

/// A fetched page and the URL it was finally served from.
pub(crate) struct WebPage {
    pub result: ProcessItemResult,
    pub final_url: String,
}

/// Web scope: http(s) only, host rule from `options.scope`, path rule from
/// `options.subpages_only`.
pub(crate) fn web_link_in_scope(seed: &Url, link: &Url, options: &ScraperOptions) -> bool {
    matches!(link.scheme(), "http" | "https")
        && in_host_scope(seed, link, options.scope)
        && (!options.subpages_only || is_subpage(seed, link))
}

#[async_trait]
impl Discoverer for WebDiscoverer {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    async fn process_item(
        &self,
        item: &QueueItem,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<ProcessItemResult> {
        Ok(self.fetch_page(item, options, signal).await?.result)
    }

    fn is_in_scope(&self, seed: &Url, link: &Url, options: &ScraperOptions) -> bool {
        web_link_in_scope(seed, link, options)
    }

    async fn cleanup(&self) -> Result<()> {
        self.fetcher.close().await
    }
}
