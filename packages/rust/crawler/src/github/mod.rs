//! GitHub sources: repository files, wiki pages, and the composite that runs
//! the wiki first and the repository second under one page budget.

mod files;
mod progress;
mod repo;
mod repo_url;
mod wiki;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use docscout_shared::{AppConfig, CancellationToken, Result, ScraperError, ScraperOptions};

use crate::engine::CrawlStrategy;
use crate::strategy::{ProgressCallback, ScraperStrategy, SourceKind};
use progress::MergedProgress;

pub use files::{TreeEntry, TreeResponse, should_process_file, should_process_file_with_options};
pub use repo::GitHubRepoDiscoverer;
pub use repo_url::{GitHubUrlInfo, GitHubUrlKind, LEGACY_FILE_SCHEME, classify, is_within_sub_path};
pub use wiki::GitHubWikiDiscoverer;

/// Wiki phase, then repository phase with whatever budget the wiki left.
pub struct GitHubScraperStrategy {
    wiki: Box<dyn ScraperStrategy>,
    repo: Box<dyn ScraperStrategy>,
}

impl GitHubScraperStrategy {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        Ok(Self::with_strategies(
            Box::new(CrawlStrategy::new(GitHubWikiDiscoverer::new(config.clone())?)),
            Box::new(CrawlStrategy::new(GitHubRepoDiscoverer::new(config)?)),
        ))
    }

    /// Compose arbitrary phase strategies.
    pub fn with_strategies(wiki: Box<dyn ScraperStrategy>, repo: Box<dyn ScraperStrategy>) -> Self {
        Self { wiki, repo }
    }
}

#[async_trait]
impl ScraperStrategy for GitHubScraperStrategy {
    fn kind(&self) -> SourceKind {
        SourceKind::GitHub
    }

    /// Base repository URLs only; tree, blob and wiki URLs go to the phase strategies.
    fn can_handle(&self, url: &str) -> bool {
        classify(url) == Some(GitHubUrlKind::Repo)
    }

    #[instrument(skip_all, fields(url = %options.url))]
    async fn scrape(
        &self,
        options: &ScraperOptions,
        progress: &dyn ProgressCallback,
        signal: Option<CancellationToken>,
    ) -> Result<()> {
        if !self.can_handle(&options.url) {
            return Err(ScraperError::invalid_url(
                &options.url,
                "expected a repository URL of the form https://github.com/{owner}/{repo}",
            ));
        }
        let info = GitHubUrlInfo::parse(&options.url)?;
        let signal = signal
            .or_else(|| options.signal.clone())
            .unwrap_or_default();
        let merged = MergedProgress::new(progress, options.max_pages);

        // Include/exclude patterns describe repository files, not wiki pages.
        let mut wiki_options = options.clone();
        wiki_options.url = format!("{}/wiki", info.repo_url());
        wiki_options.include_patterns.clear();
        wiki_options.exclude_patterns.clear();

        info!(url = %wiki_options.url, "scraping wiki");
        if let Err(e) = self
            .wiki
            .scrape(&wiki_options, &merged, Some(signal.clone()))
            .await
        {
            warn!(error = %e, "wiki unavailable, continuing with repository");
        }
        if signal.is_cancelled() {
            return Ok(());
        }

        let wiki_pages = merged.finish_wiki().await;
        let remaining = options.max_pages.saturating_sub(wiki_pages);
        if remaining == 0 {
            info!(wiki_pages, max_pages = options.max_pages, "page budget used up by wiki, skipping repository");
            return Ok(());
        }

        let mut repo_options = options.clone();
        repo_options.max_pages = remaining;
        info!(wiki_pages, remaining, "scraping repository");
        self.repo.scrape(&repo_options, &merged, Some(signal)).await
    }

    /// Both phases are cleaned up even when one fails; the first failure is returned.
    async fn cleanup(&self) -> Result<()> {
        let (wiki, repo) = tokio::join!(self.wiki.cleanup(), self.repo.cleanup());
        if let Err(e) = &wiki {
            warn!(error = %e, "wiki cleanup failed");
        }
        if let Err(e) = &repo {
            warn!(error = %e, "repository cleanup failed");
        }
        wiki.and(repo)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use docscout_shared::ScraperProgressEvent;

    use super::*;
    use crate::engine::tests::Recorder;
    use crate::sources::test_config;
    use crate::strategy::NoopProgress;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Emits `pages` events and records the options it ran with.
    pub(crate) struct FakePhase {
        pub pages: usize,
        pub fail: bool,
        pub fail_cleanup: bool,
        pub seen: Arc<Mutex<Vec<ScraperOptions>>>,
        pub cleaned: Arc<Mutex<bool>>,
    }

    impl FakePhase {
        pub(crate) fn new(pages: usize) -> Self {
            Self {
                pages,
                fail: false,
                fail_cleanup: false,
                seen: Arc::default(),
                cleaned: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl ScraperStrategy for FakePhase {
        fn kind(&self) -> SourceKind {
            SourceKind::Web
        }

        fn can_handle(&self, _url: &str) -> bool {
            true
        }

        async fn scrape(
            &self,
            options: &ScraperOptions,
            progress: &dyn ProgressCallback,
            _signal: Option<CancellationToken>,
        ) -> Result<()> {
            self.seen.lock().unwrap().push(options.clone());
            if self.fail {
                return Err(ScraperError::WikiUnavailable {
                    url: options.url.clone(),
                    reason: "disabled".into(),
                });
            }
            for n in 1..=self.pages.min(options.max_pages) {
                progress
                    .on_progress(ScraperProgressEvent {
                        current_url: format!("{}/{n}", options.url),
                        pages_scraped: n,
                        max_pages: options.max_pages,
                        total_pages: self.pages.min(options.max_pages),
                        total_discovered: self.pages,
                        depth: 1,
                        max_depth: options.max_depth,
                        document: None,
                    })
                    .await?;
            }
            Ok(())
        }

        async fn cleanup(&self) -> Result<()> {
            *self.cleaned.lock().unwrap() = true;
            if self.fail_cleanup {
                Err(ScraperError::Network("close failed".into()))
            } else {
                Ok(())
            }
        }
    }

    const REPO: &str = "https://github.com/acme/widgets";

    fn options(max_pages: usize) -> ScraperOptions {
        let mut opts = ScraperOptions::new(REPO, "widgets", "1.0.0");
        opts.max_pages = max_pages;
        opts.include_patterns = vec!["**/*.md".into()];
        opts
    }

    #[tokio::test]
    async fn repo_gets_remaining_budget() {
        let wiki = FakePhase::new(7);
        let repo = FakePhase::new(20);
        let (wiki_seen, repo_seen) = (wiki.seen.clone(), repo.seen.clone());
        let strategy = GitHubScraperStrategy::with_strategies(Box::new(wiki), Box::new(repo));
        let recorder = Recorder::default();

        strategy.scrape(&options(10), &recorder, None).await.unwrap();

        let wiki_opts = wiki_seen.lock().unwrap();
        assert_eq!(wiki_opts[0].url, "https://github.com/acme/widgets/wiki");
        assert!(wiki_opts[0].include_patterns.is_empty());
        let repo_opts = repo_seen.lock().unwrap();
        assert_eq!(repo_opts[0].max_pages, 3);
        assert_eq!(repo_opts[0].url, REPO);

        let scraped: Vec<usize> = recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.pages_scraped)
            .collect();
        assert_eq!(scraped, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn repo_is_skipped_when_wiki_uses_the_budget() {
        let wiki = FakePhase::new(10);
        let repo = FakePhase::new(5);
        let repo_seen = repo.seen.clone();
        let strategy = GitHubScraperStrategy::with_strategies(Box::new(wiki), Box::new(repo));

        strategy
            .scrape(&options(10), &NoopProgress, None)
            .await
            .unwrap();
        assert!(repo_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wiki_failure_is_not_fatal() {
        let mut wiki = FakePhase::new(0);
        wiki.fail = true;
        let repo = FakePhase::new(2);
        let repo_seen = repo.seen.clone();
        let strategy = GitHubScraperStrategy::with_strategies(Box::new(wiki), Box::new(repo));
        let recorder = Recorder::default();

        strategy.scrape(&options(10), &recorder, None).await.unwrap();
        assert_eq!(repo_seen.lock().unwrap()[0].max_pages, 10);
        assert_eq!(recorder.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejects_non_repository_urls() {
        let strategy =
            GitHubScraperStrategy::with_strategies(Box::new(FakePhase::new(0)), Box::new(FakePhase::new(0)));
        let mut opts = options(10);
        opts.url = "https://github.com/acme/widgets/tree/main/docs".into();
        let err = strategy
            .scrape(&opts, &NoopProgress, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::InvalidUrl { .. }));
        assert!(!strategy.can_handle(&opts.url));
        assert!(strategy.can_handle("https://www.github.com/acme/widgets/"));
    }

    #[tokio::test]
    async fn cleanup_runs_both_phases() {
        let mut wiki = FakePhase::new(0);
        wiki.fail_cleanup = true;
        let repo = FakePhase::new(0);
        let (wiki_cleaned, repo_cleaned) = (wiki.cleaned.clone(), repo.cleaned.clone());
        let strategy = GitHubScraperStrategy::with_strategies(Box::new(wiki), Box::new(repo));

        assert!(strategy.cleanup().await.is_err());
        assert!(*wiki_cleaned.lock().unwrap());
        assert!(*repo_cleaned.lock().unwrap());
    }

    #[tokio::test]
    async fn cancelled_before_repo_phase() {
        let token = CancellationToken::new();
        token.cancel();
        let repo = FakePhase::new(3);
        let repo_seen = repo.seen.clone();
        let strategy = GitHubScraperStrategy::with_strategies(Box::new(FakePhase::new(0)), Box::new(repo));

        strategy
            .scrape(&options(10), &NoopProgress, Some(token))
            .await
            .unwrap();
        assert!(repo_seen.lock().unwrap().is_empty());
    }

    /// Runs `inner` against a mock server standing in for github.com.
    struct Rehosted {
        inner: Box<dyn ScraperStrategy>,
        base: String,
    }

    #[async_trait]
    impl ScraperStrategy for Rehosted {
        fn kind(&self) -> SourceKind {
            self.inner.kind()
        }

        fn can_handle(&self, _url: &str) -> bool {
            true
        }

        async fn scrape(
            &self,
            options: &ScraperOptions,
            progress: &dyn ProgressCallback,
            signal: Option<CancellationToken>,
        ) -> Result<()> {
            let mut options = options.clone();
            options.url = options.url.replacen("https://github.com", &self.base, 1);
            self.inner.scrape(&options, progress, signal).await
        }
    }

    #[tokio::test]
    async fn wiki_redirect_leaves_full_budget_to_repo() {
        let server = MockServer::start().await;
        Mock::given(path("/acme/widgets/wiki"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/acme/widgets"))
            .mount(&server)
            .await;
        Mock::given(path("/acme/widgets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><body><h1>widgets</h1></body></html>"),
            )
            .mount(&server)
            .await;

        let wiki = Rehosted {
            inner: Box::new(CrawlStrategy::new(GitHubWikiDiscoverer::new(test_config()).unwrap())),
            base: server.uri(),
        };
        let repo = FakePhase::new(2);
        let repo_seen = repo.seen.clone();
        let strategy = GitHubScraperStrategy::with_strategies(Box::new(wiki), Box::new(repo));
        let recorder = Recorder::default();

        strategy.scrape(&options(10), &recorder, None).await.unwrap();
        assert_eq!(repo_seen.lock().unwrap()[0].max_pages, 10);
        assert_eq!(recorder.events.lock().unwrap().len(), 2);
    }
}
