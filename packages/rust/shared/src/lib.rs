//! Shared types, error model, and configuration for docscout.
//!
//! This crate is the foundation depended on by all other docscout crates.
//! It provides:
//! - [`ScraperError`] - the unified error type
//! - Domain types ([`ScraperOptions`], [`Document`], [`RawContent`], [`ScraperProgressEvent`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GitHubConfig, ScraperConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{Result, ScraperError};
pub use types::{
    Document, DocumentMetadata, FetchStatus, QueueItem, RawContent, ScrapeScope,
    ScraperOptions, ScraperProgressEvent,
};

pub use tokio_util::sync::CancellationToken;
