//! Per-source discoverers run by the generic crawl engine.

mod local_file;
mod package_site;
mod web;

pub use local_file::LocalFileDiscoverer;
pub use package_site::{NPM_HOSTS, PYPI_HOSTS, PackageSiteDiscoverer};
pub use web::WebDiscoverer;

pub(crate) use web::web_link_in_scope;
#[cfg(test)]
pub(crate) use web::tests::test_config;

use url::Url;

/// Whether `url` parses and its host is one of `hosts`. Parse failures are non-matches.
pub(crate) fn host_in(url: &str, hosts: &[&str]) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| hosts.contains(&host.as_str()))
}
