//! URL to strategy dispatch.
//!
//! Predicates are evaluated in order, most specific first. Each call builds a
//! new strategy, so concurrent jobs never share crawl state.

use std::sync::Arc;

use tracing::debug;

use docscout_shared::{AppConfig, Result, ScraperError};

use crate::engine::CrawlStrategy;
use crate::github::{
    GitHubRepoDiscoverer, GitHubScraperStrategy, GitHubUrlKind, GitHubWikiDiscoverer,
    LEGACY_FILE_SCHEME, classify,
};
use crate::sources::{
    LocalFileDiscoverer, NPM_HOSTS, PYPI_HOSTS, PackageSiteDiscoverer, WebDiscoverer, host_in,
};
use crate::strategy::{ScraperStrategy, SourceKind};

type Predicate = fn(&str) -> bool;
type Constructor = fn(Arc<AppConfig>) -> Result<Box<dyn ScraperStrategy>>;

/// One dispatch rule.
struct Entry {
    kind: SourceKind,
    matches: Predicate,
    build: Constructor,
}

/// Outcome of a registry lookup.
pub enum StrategyLookup {
    Found(Box<dyn ScraperStrategy>),
    NotFound,
}

pub struct ScraperRegistry {
    config: Arc<AppConfig>,
    entries: Vec<Entry>,
}

impl ScraperRegistry {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let entries = vec![
            Entry {
                kind: SourceKind::LocalFile,
                matches: |url| url.starts_with("file://"),
                build: |_| Ok(Box::new(CrawlStrategy::new(LocalFileDiscoverer::new()))),
            },
            Entry {
                kind: SourceKind::GitHubWiki,
                matches: |url| classify(url) == Some(GitHubUrlKind::Wiki),
                build: |config| Ok(Box::new(CrawlStrategy::new(GitHubWikiDiscoverer::new(config)?))),
            },
            Entry {
                kind: SourceKind::Npm,
                matches: |url| host_in(url, NPM_HOSTS),
                build: |config| Ok(Box::new(CrawlStrategy::new(PackageSiteDiscoverer::npm(config)?))),
            },
            Entry {
                kind: SourceKind::PyPi,
                matches: |url| host_in(url, PYPI_HOSTS),
                build: |config| Ok(Box::new(CrawlStrategy::new(PackageSiteDiscoverer::pypi(config)?))),
            },
            Entry {
                kind: SourceKind::GitHub,
                matches: |url| classify(url) == Some(GitHubUrlKind::Repo),
                build: |config| Ok(Box::new(GitHubScraperStrategy::new(config)?)),
            },
            Entry {
                kind: SourceKind::GitHubRepo,
                matches: |url| {
                    url.starts_with(LEGACY_FILE_SCHEME)
                        || matches!(classify(url), Some(GitHubUrlKind::Tree | GitHubUrlKind::Blob))
                },
                build: |config| Ok(Box::new(CrawlStrategy::new(GitHubRepoDiscoverer::new(config)?))),
            },
            Entry {
                kind: SourceKind::Web,
                matches: |url| url.starts_with("http://") || url.starts_with("https://"),
                build: |config| Ok(Box::new(CrawlStrategy::new(WebDiscoverer::new(config)?))),
            },
        ];
        Self { config, entries }
    }

    /// Source kind that would handle `url`, without constructing anything.
    pub fn detect(&self, url: &str) -> Option<SourceKind> {
        self.entries
            .iter()
            .find(|entry| (entry.matches)(url))
            .map(|entry| entry.kind)
    }

    /// Build a fresh strategy for `url`.
    pub fn resolve(&self, url: &str) -> Result<StrategyLookup> {
        let Some(entry) = self.entries.iter().find(|entry| (entry.matches)(url)) else {
            return Ok(StrategyLookup::NotFound);
        };
        debug!(%url, kind = %entry.kind, "strategy selected");
        (entry.build)(self.config.clone()).map(StrategyLookup::Found)
    }

    /// [`resolve`](Self::resolve), failing with [`ScraperError::NoStrategy`] when nothing matches.
    pub fn get_strategy(&self, url: &str) -> Result<Box<dyn ScraperStrategy>> {
        match self.resolve(url)? {
            StrategyLookup::Found(strategy) => Ok(strategy),
            StrategyLookup::NotFound => Err(ScraperError::NoStrategy { url: url.into() }),
        }
    }
}
