//! Crawl engine, source strategies, and the scrape service.
//!
//! This crate provides:
//! - [`ScraperService`]: resolves a strategy for a URL, runs it, and cleans up
//! - [`ScraperRegistry`]: ordered URL to strategy dispatch
//! - [`CrawlStrategy`]: the breadth-first crawl shared by every source
//! - [`sources`] and [`github`]: per-source discoverers

mod content;
pub mod engine;
pub mod github;
pub mod registry;
pub mod scope;
pub mod service;
pub mod sources;
pub mod strategy;

pub use engine::{CrawlStrategy, Discoverer};
pub use github::{GitHubRepoDiscoverer, GitHubScraperStrategy, GitHubWikiDiscoverer};
pub use registry::{ScraperRegistry, StrategyLookup};
pub use scope::{NormalizeOptions, PatternFilter, is_subpage, normalize_url, normalize_url_with};
pub use service::ScraperService;
pub use sources::{LocalFileDiscoverer, PackageSiteDiscoverer, WebDiscoverer};
pub use strategy::{
    NoopProgress, ProcessItemResult, ProgressCallback, ProgressFn, ScraperStrategy, SourceKind,
};
