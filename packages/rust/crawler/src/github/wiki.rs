//! GitHub wiki pages, crawled as HTML.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use docscout_shared::{
    AppConfig, CancellationToken, FetchStatus, QueueItem, Result, ScraperError, ScraperOptions,
};

use super::repo_url::{GitHubUrlInfo, GitHubUrlKind, classify};
use crate::engine::Discoverer;
use crate::sources::WebDiscoverer;
use crate::strategy::{ProcessItemResult, SourceKind};

/// Wiki views that are not content.
const IGNORED_VIEWS: &[&str] = &["_history", "_compare", "_new", "_edit"];

pub struct GitHubWikiDiscoverer {
    web: WebDiscoverer,
}

impl GitHubWikiDiscoverer {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        Ok(Self {
            web: WebDiscoverer::new(config)?,
        })
    }
}

/// Whether `link` is a content page of the same wiki as `seed`.
fn is_wiki_page(seed: &Url, link: &Url) -> bool {
    if link.query().is_some() || classify(link.as_str()) != Some(GitHubUrlKind::Wiki) {
        return false;
    }
    let (Ok(seed_info), Ok(link_info)) = (
        GitHubUrlInfo::parse(seed.as_str()),
        GitHubUrlInfo::parse(link.as_str()),
    ) else {
        return false;
    };
    if !seed_info.owner.eq_ignore_ascii_case(&link_info.owner)
        || !seed_info.repo.eq_ignore_ascii_case(&link_info.repo)
    {
        return false;
    }
    link.path_segments()
        .is_some_and(|mut segments| !segments.any(|s| IGNORED_VIEWS.contains(&s)))
}

/// Whether `url` has the `/{owner}/{repo}/wiki[/...]` path shape, on any host.
fn is_wiki_path(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| {
        let segments: Vec<&str> = u
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        matches!(segments.as_slice(), [_, _, "wiki", ..])
    })
}

#[async_trait]
impl Discoverer for GitHubWikiDiscoverer {
    fn kind(&self) -> SourceKind {
        SourceKind::GitHubWiki
    }

    fn can_handle(&self, url: &str) -> bool {
        classify(url) == Some(GitHubUrlKind::Wiki)
    }

    async fn process_item(
        &self,
        item: &QueueItem,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<ProcessItemResult> {
        let page = self.web.fetch_page(item, options, signal).await?;

        if item.depth == 0 {
            if page.result.status == FetchStatus::NotFound {
                return Err(ScraperError::WikiUnavailable {
                    url: item.url.clone(),
                    reason: "page not found".into(),
                });
            }
            // Repositories without a wiki redirect to the repository page.
            if !is_wiki_path(&page.final_url) {
                return Err(ScraperError::WikiUnavailable {
                    url: item.url.clone(),
                    reason: format!("redirected to {}", page.final_url),
                });
            }
        }

        debug!(url = %item.url, links = page.result.links.len(), "wiki page fetched");
        Ok(page.result)
    }

    fn is_in_scope(&self, seed: &Url, link: &Url, _options: &ScraperOptions) -> bool {
        is_wiki_page(seed, link)
    }

    async fn cleanup(&self) -> Result<()> {
        self.web.cleanup().await
    }
}
