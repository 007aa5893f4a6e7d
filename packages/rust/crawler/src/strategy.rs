//! The strategy contract shared by every source kind.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use docscout_shared::{
    CancellationToken, Document, FetchStatus, Result, ScraperOptions, ScraperProgressEvent,
};

// ---------------------------------------------------------------------------
// Progress sink
// ---------------------------------------------------------------------------

/// Receives one event per processed item. The crawl waits for each call to
/// finish before moving on, so a slow consumer throttles the job.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    async fn on_progress(&self, event: ScraperProgressEvent) -> Result<()>;
}

/// Adapts a synchronous closure into a [`ProgressCallback`].
pub struct ProgressFn<F>(pub F);

#[async_trait]
impl<F> ProgressCallback for ProgressFn<F>
where
    F: Fn(ScraperProgressEvent) -> Result<()> + Send + Sync,
{
    async fn on_progress(&self, event: ScraperProgressEvent) -> Result<()> {
        (self.0)(event)
    }
}

/// Discards every event.
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_progress(&self, _event: ScraperProgressEvent) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Source kinds the registry can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Web,
    LocalFile,
    GitHubRepo,
    GitHubWiki,
    /// Wiki followed by repository, sharing one budget.
    GitHub,
    Npm,
    PyPi,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Web => "web",
            Self::LocalFile => "local-file",
            Self::GitHubRepo => "github-repo",
            Self::GitHubWiki => "github-wiki",
            Self::GitHub => "github",
            Self::Npm => "npm",
            Self::PyPi => "pypi",
        };
        f.write_str(name)
    }
}

/// One scrape job for one source kind.
///
/// Instances are created fresh per job by the registry and must not be reused.
#[async_trait]
pub trait ScraperStrategy: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this strategy accepts `url` as a seed.
    fn can_handle(&self, url: &str) -> bool;

    /// Run the job, reporting every processed item to `progress`.
    ///
    /// `signal` takes precedence over `options.signal`. Cancellation ends the
    /// job early with `Ok(())`.
    async fn scrape(
        &self,
        options: &ScraperOptions,
        progress: &dyn ProgressCallback,
        signal: Option<CancellationToken>,
    ) -> Result<()>;

    /// Release resources held by the strategy. Called exactly once per job.
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

/// What a discoverer learned from one queue item.
#[derive(Debug, Clone)]
pub struct ProcessItemResult {
    pub document: Option<Document>,
    /// Candidate links; the engine applies depth, scope and pattern rules.
    pub links: Vec<String>,
    pub status: FetchStatus,
}

impl ProcessItemResult {
    pub fn not_found() -> Self {
        Self {
            status: FetchStatus::NotFound,
            ..Self::default()
        }
    }

    pub fn links(links: Vec<String>) -> Self {
        Self {
            links,
            ..Self::default()
        }
    }
}

impl Default for ProcessItemResult {
    fn default() -> Self {
        Self {
            document: None,
            links: Vec::new(),
            status: FetchStatus::Success,
        }
    }
}
