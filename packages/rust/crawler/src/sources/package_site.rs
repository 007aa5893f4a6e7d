//! Package registry websites (npm, PyPI).

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use docscout_shared::{AppConfig, CancellationToken, QueueItem, Result, ScraperOptions};

use super::{WebDiscoverer, host_in, web_link_in_scope};
use crate::engine::Discoverer;
use crate::scope::{NormalizeOptions, normalize_url_with};
use crate::strategy::{ProcessItemResult, SourceKind};

pub const NPM_HOSTS: &[&str] = &["npmjs.org", "www.npmjs.org", "npmjs.com", "www.npmjs.com"];
pub const PYPI_HOSTS: &[&str] = &["pypi.org", "www.pypi.org"];

/// Web discovery confined to one registry site.
///
/// Package pages carry tab and tracking query parameters, so URLs are
/// deduplicated without their query string.
pub struct PackageSiteDiscoverer {
    kind: SourceKind,
    hosts: &'static [&'static str],
    web: WebDiscoverer,
}

impl PackageSiteDiscoverer {
    pub fn npm(config: Arc<AppConfig>) -> Result<Self> {
        Self::new(SourceKind::Npm, NPM_HOSTS, config)
    }

    pub fn pypi(config: Arc<AppConfig>) -> Result<Self> {
        Self::new(SourceKind::PyPi, PYPI_HOSTS, config)
    }

    fn new(kind: SourceKind, hosts: &'static [&'static str], config: Arc<AppConfig>) -> Result<Self> {
        Ok(Self {
            kind,
            hosts,
            web: WebDiscoverer::new(config)?,
        })
    }
}

#[async_trait]
impl Discoverer for PackageSiteDiscoverer {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn can_handle(&self, url: &str) -> bool {
        host_in(url, self.hosts)
    }

    async fn process_item(
        &self,
        item: &QueueItem,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<ProcessItemResult> {
        Ok(self.web.fetch_page(item, options, signal).await?.result)
    }

    fn is_in_scope(&self, seed: &Url, link: &Url, options: &ScraperOptions) -> bool {
        host_in(link.as_str(), self.hosts) && web_link_in_scope(seed, link, options)
    }

    fn normalize(&self, url: &str) -> String {
        normalize_url_with(
            url,
            NormalizeOptions {
                remove_query: true,
                ignore_case: false,
            },
        )
    }

    async fn cleanup(&self) -> Result<()> {
        self.web.cleanup().await
    }
}
