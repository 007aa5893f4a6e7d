//! Public entry point for running one scrape job.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use docscout_shared::{AppConfig, CancellationToken, Result, ScraperOptions};

use crate::registry::ScraperRegistry;
use crate::strategy::{ProgressCallback, ScraperStrategy};

pub struct ScraperService {
    registry: ScraperRegistry,
}

impl ScraperService {
    pub fn new(registry: ScraperRegistry) -> Self {
        Self { registry }
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self::new(ScraperRegistry::new(config))
    }

    pub fn registry(&self) -> &ScraperRegistry {
        &self.registry
    }

    /// Resolve a strategy for `options.url`, run it, and always clean it up.
    #[instrument(skip_all, fields(url = %options.url, library = %options.library))]
    pub async fn scrape(
        &self,
        options: &ScraperOptions,
        progress: &dyn ProgressCallback,
        signal: Option<CancellationToken>,
    ) -> Result<()> {
        let strategy = self.registry.get_strategy(&options.url)?;
        info!(kind = %strategy.kind(), "scrape started");
        run_with_cleanup(strategy.as_ref(), options, progress, signal).await
    }
}

/// Run `strategy`, then clean it up regardless of outcome.
///
/// A scrape error wins over a cleanup error; a cleanup error is returned only
/// when the scrape itself succeeded.
pub(crate) async fn run_with_cleanup(
    strategy: &dyn ScraperStrategy,
    options: &ScraperOptions,
    progress: &dyn ProgressCallback,
    signal: Option<CancellationToken>,
) -> Result<()> {
    let outcome = strategy.scrape(options, progress, signal).await;
    let cleanup = strategy.cleanup().await;

    match (outcome, cleanup) {
        (Ok(()), Ok(())) => {
            info!("scrape finished");
            Ok(())
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "cleanup failed after scrape error");
            Err(e)
        }
        (Ok(()), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "cleanup failed");
            Err(cleanup_err)
        }
    }
}
