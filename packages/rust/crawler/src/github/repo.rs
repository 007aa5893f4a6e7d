//! Repository files via the GitHub REST API and raw content host.
//!
//! The recursive tree is listed once, at the seed. Every accepted file becomes
//! a `https://github.com/{owner}/{repo}/blob/{branch}/{path}` link whose
//! content is later read from the raw host.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use docscout_fetcher::{ContentFetcher, FetchOptions, HttpFetcher, mime_for_path};
use docscout_pipeline::PipelineRegistry;
use docscout_shared::{
    AppConfig, CancellationToken, FetchStatus, QueueItem, Result, ScraperError, ScraperOptions,
};

use super::files::{TreeResponse, should_process_file};
use super::repo_url::{GitHubUrlInfo, GitHubUrlKind, LEGACY_FILE_SCHEME, blob_path, classify, is_within_sub_path};
use crate::content::extract_document;
use crate::engine::Discoverer;
use crate::scope::PatternFilter;
use crate::strategy::{ProcessItemResult, SourceKind};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

pub struct GitHubRepoDiscoverer {
    http: HttpFetcher,
    pipelines: PipelineRegistry,
    config: Arc<AppConfig>,
}

impl GitHubRepoDiscoverer {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(&config.scraper)?,
            pipelines: PipelineRegistry::new(),
            config,
        })
    }

    /// Forwarded headers plus a token from the environment when none is given.
    fn request_headers(&self, options: &ScraperOptions) -> HashMap<String, String> {
        let mut headers = options.headers.clone();
        let has_auth = headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("authorization"));
        if !has_auth {
            if let Some(token) = self.config.github.token_from_env() {
                headers.insert("Authorization".into(), format!("Bearer {token}"));
            }
        }
        headers
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        info: &GitHubUrlInfo,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<T> {
        let mut headers = self.request_headers(options);
        if !headers.keys().any(|k| k.eq_ignore_ascii_case("accept")) {
            headers.insert("Accept".into(), GITHUB_ACCEPT.into());
        }
        let fetch_options = FetchOptions {
            headers,
            signal: Some(signal.clone()),
            follow_redirects: true,
        };

        let raw = self
            .http
            .fetch(url, &fetch_options)
            .await
            .map_err(|e| classify_error(e, url))?;
        if raw.status == FetchStatus::NotFound {
            return Err(ScraperError::GitHubNotFound {
                owner: info.owner.clone(),
                repo: info.repo.clone(),
            });
        }

        serde_json::from_slice(&raw.content).map_err(|e| {
            ScraperError::parse(format!("failed to parse GitHub API response from {url}: {e}"))
        })
    }

    /// List the repository tree and turn accepted files into blob links.
    #[instrument(skip_all, fields(owner = %info.owner, repo = %info.repo))]
    async fn discover(
        &self,
        info: &GitHubUrlInfo,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<Vec<String>> {
        let api = self.config.github.api_url.trim_end_matches('/');

        let branch = match &info.branch {
            Some(branch) => branch.clone(),
            None => {
                let url = format!("{api}/repos/{}/{}", info.owner, info.repo);
                self.get_json::<RepoInfo>(&url, info, options, signal)
                    .await?
                    .default_branch
            }
        };

        let tree_url = format!(
            "{api}/repos/{}/{}/git/trees/{branch}?recursive=1",
            info.owner, info.repo
        );
        let tree: TreeResponse = self.get_json(&tree_url, info, options, signal).await?;
        if tree.truncated {
            warn!(sha = %tree.sha, entries = tree.tree.len(), "repository tree truncated by GitHub, some files are missing");
        }

        let filter = PatternFilter::new(&options.include_patterns, &options.exclude_patterns)?;
        let links: Vec<String> = tree
            .tree
            .iter()
            .filter(|entry| entry.kind == "blob")
            .filter(|entry| should_process_file(entry, &filter))
            .filter(|entry| is_within_sub_path(&entry.path, info.sub_path.as_deref()))
            .map(|entry| info.blob_url(&branch, &entry.path))
            .collect();

        debug!(%branch, total = tree.tree.len(), accepted = links.len(), "repository tree listed");
        Ok(links)
    }

    /// Read one file from the raw content host.
    async fn fetch_file(
        &self,
        item: &QueueItem,
        info: &GitHubUrlInfo,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<ProcessItemResult> {
        let (Some(branch), Some(path)) = (&info.branch, &info.file_path) else {
            return Err(ScraperError::invalid_url(&item.url, "blob URL without branch or path"));
        };
        let raw_url = format!(
            "{}/{}/{}/{branch}/{path}",
            self.config.github.raw_url.trim_end_matches('/'),
            info.owner,
            info.repo
        );
        let fetch_options = FetchOptions {
            headers: self.request_headers(options),
            signal: Some(signal.clone()),
            follow_redirects: true,
        };

        let mut raw = self
            .http
            .fetch(&raw_url, &fetch_options)
            .await
            .map_err(|e| classify_error(e, &raw_url))?;
        if raw.status != FetchStatus::Success {
            debug!(url = %item.url, "file not found on raw host");
            return Ok(ProcessItemResult::not_found());
        }
        // The raw host serves everything as text/plain.
        raw.mime_type = mime_for_path(path);

        let extracted = extract_document(
            &self.pipelines,
            &raw,
            &item.url,
            item,
            options,
            Some(path.clone()),
        );
        Ok(ProcessItemResult {
            document: extracted.document,
            links: Vec::new(),
            status: FetchStatus::Success,
        })
    }
}

/// Turn transport failures into actionable GitHub errors.
fn classify_error(err: ScraperError, url: &str) -> ScraperError {
    let status = match &err {
        ScraperError::Http { status, .. } => Some(*status),
        ScraperError::Cancelled => return err,
        other => {
            let msg = other.to_string();
            if msg.contains("401") {
                Some(401)
            } else if msg.contains("403") {
                Some(403)
            } else {
                None
            }
        }
    };
    match status {
        Some(401) => ScraperError::GitHubAuth { url: url.into() },
        Some(403) => ScraperError::GitHubAccessDenied { url: url.into() },
        _ => err,
    }
}

#[async_trait]
impl Discoverer for GitHubRepoDiscoverer {
    fn kind(&self) -> SourceKind {
        SourceKind::GitHubRepo
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with(LEGACY_FILE_SCHEME)
            || matches!(
                classify(url),
                Some(GitHubUrlKind::Repo | GitHubUrlKind::Tree | GitHubUrlKind::Blob)
            )
    }

    async fn process_item(
        &self,
        item: &QueueItem,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<ProcessItemResult> {
        if item.url.starts_with(LEGACY_FILE_SCHEME) {
            debug!(url = %item.url, "legacy github-file URL is not resolved");
            return Ok(ProcessItemResult::not_found());
        }

        let info = GitHubUrlInfo::parse(&item.url)?;
        if info.is_blob {
            let mut result = self.fetch_file(item, &info, options, signal).await?;
            if item.depth == 0 {
                // A file seed is its own, single link.
                result.links = vec![item.url.clone()];
            }
            return Ok(result);
        }
        if item.depth > 0 {
            return Ok(ProcessItemResult::default());
        }

        let links = self.discover(&info, options, signal).await?;
        Ok(ProcessItemResult::links(links))
    }

    /// Only blob links of the seed's repository.
    fn is_in_scope(&self, seed: &Url, link: &Url, _options: &ScraperOptions) -> bool {
        GitHubUrlInfo::parse(seed.as_str())
            .is_ok_and(|info| blob_path(link, &info.owner, &info.repo).is_some())
    }

    /// Repository-relative path.
    fn filter_target(&self, seed: &Url, link: &Url) -> Option<String> {
        let info = GitHubUrlInfo::parse(seed.as_str()).ok()?;
        blob_path(link, &info.owner, &info.repo)
    }

    async fn cleanup(&self) -> Result<()> {
        self.http.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CrawlStrategy;
    use crate::engine::tests::Recorder;
    use crate::strategy::ScraperStrategy;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPO: &str = "https://github.com/acme/widgets";

    fn config(server: &MockServer) -> Arc<AppConfig> {
        let mut config = AppConfig::default();
        config.scraper.max_retries = 0;
        config.github.api_url = server.uri();
        config.github.raw_url = format!("{}/raw", server.uri());
        config.github.token_env = Vec::new();
        Arc::new(config)
    }

    fn tree_json() -> serde_json::Value {
        serde_json::json!({
            "sha": "abc123",
            "truncated": false,
            "tree": [
                {"path": "README.md", "type": "blob", "sha": "1", "size": 20, "url": "u1"},
                {"path": "docs", "type": "tree", "sha": "2", "url": "u2"},
                {"path": "docs/guide.md", "type": "blob", "sha": "3", "size": 30, "url": "u3"},
                {"path": "image.png", "type": "blob", "sha": "4", "size": 999, "url": "u4"},
                {"path": "src/lib.rs", "type": "blob", "sha": "5", "size": 40, "url": "u5"}
            ]
        })
    }

    async fn mount_repo(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"default_branch": "main"})),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/git/trees/main"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tree_json()))
            .mount(server)
            .await;
    }

    async fn process(
        discoverer: &GitHubRepoDiscoverer,
        url: &str,
        depth: usize,
        options: &ScraperOptions,
    ) -> Result<ProcessItemResult> {
        discoverer
            .process_item(&QueueItem::new(url, depth), options, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn discovers_text_blobs_at_root() {
        let server = MockServer::start().await;
        mount_repo(&server).await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let opts = ScraperOptions::new(REPO, "widgets", "");

        let result = process(&discoverer, REPO, 0, &opts).await.unwrap();
        assert_eq!(
            result.links,
            vec![
                "https://github.com/acme/widgets/blob/main/README.md",
                "https://github.com/acme/widgets/blob/main/docs/guide.md",
                "https://github.com/acme/widgets/blob/main/src/lib.rs",
            ]
        );
        assert!(result.document.is_none());
    }

    #[tokio::test]
    async fn tree_url_limits_to_sub_path_and_skips_repo_lookup() {
        let server = MockServer::start().await;
        Mock::given(path("/repos/acme/widgets/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tree_json()))
            .mount(&server)
            .await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let seed = "https://github.com/acme/widgets/tree/main/docs";
        let opts = ScraperOptions::new(seed, "widgets", "");

        let result = process(&discoverer, seed, 0, &opts).await.unwrap();
        assert_eq!(
            result.links,
            vec!["https://github.com/acme/widgets/blob/main/docs/guide.md"]
        );
    }

    #[tokio::test]
    async fn blob_seed_links_only_itself() {
        let server = MockServer::start().await;
        Mock::given(path("/raw/acme/widgets/main/docs/guide.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Guide\n\nSteps.\n"))
            .mount(&server)
            .await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let seed = "https://github.com/acme/widgets/blob/main/docs/guide.md";
        let opts = ScraperOptions::new(seed, "widgets", "");

        let result = process(&discoverer, seed, 0, &opts).await.unwrap();
        assert_eq!(result.links, vec![seed]);
        let doc = result.document.unwrap();
        assert_eq!(doc.metadata.title, "Guide");
        assert_eq!(doc.metadata.path.as_deref(), Some("docs/guide.md"));
        assert_eq!(doc.content_type.as_deref(), Some("text/markdown"));
    }

    #[tokio::test]
    async fn legacy_file_urls_are_not_found_at_any_depth() {
        let server = MockServer::start().await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let url = "github-file://src/cli/types.ts";
        let opts = ScraperOptions::new(url, "widgets", "");

        for depth in 0..=2 {
            let result = process(&discoverer, url, depth, &opts).await.unwrap();
            assert_eq!(result.status, FetchStatus::NotFound);
            assert!(result.links.is_empty());
        }
    }

    #[tokio::test]
    async fn missing_repo_mentions_token() {
        let server = MockServer::start().await;
        Mock::given(path("/repos/acme/widgets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let opts = ScraperOptions::new(REPO, "widgets", "");

        let err = process(&discoverer, REPO, 0, &opts).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not found or not accessible"), "{msg}");
        assert!(msg.contains("GITHUB_TOKEN"), "{msg}");
    }

    #[tokio::test]
    async fn missing_tree_is_not_found_too() {
        let server = MockServer::start().await;
        Mock::given(path("/repos/acme/widgets/git/trees/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let seed = "https://github.com/acme/widgets/tree/gone";
        let opts = ScraperOptions::new(seed, "widgets", "");

        let err = process(&discoverer, seed, 0, &opts).await.unwrap_err();
        assert!(matches!(err, ScraperError::GitHubNotFound { .. }));
    }

    #[tokio::test]
    async fn auth_and_permission_failures_are_distinguished() {
        for (status, expected) in [(401, "GitHub authentication failed"), (403, "GitHub access denied")] {
            let server = MockServer::start().await;
            Mock::given(path("/repos/acme/widgets"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
            let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
            let opts = ScraperOptions::new(REPO, "widgets", "");

            let err = process(&discoverer, REPO, 0, &opts).await.unwrap_err();
            assert!(err.to_string().contains(expected), "{err}");
        }
    }

    #[test]
    fn transport_messages_are_classified() {
        let err = classify_error(ScraperError::Network("server said 401 Unauthorized".into()), "u");
        assert!(matches!(err, ScraperError::GitHubAuth { .. }));
        let err = classify_error(ScraperError::Network("403 rate limit".into()), "u");
        assert!(matches!(err, ScraperError::GitHubAccessDenied { .. }));
        let err = classify_error(ScraperError::Network("connection reset".into()), "u");
        assert!(matches!(err, ScraperError::Network(_)));
    }

    #[tokio::test]
    async fn invalid_tree_json_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(path("/repos/acme/widgets/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let seed = "https://github.com/acme/widgets/tree/main";
        let opts = ScraperOptions::new(seed, "widgets", "");

        let err = process(&discoverer, seed, 0, &opts).await.unwrap_err();
        assert!(err.to_string().contains("failed to parse GitHub API response"));
    }

    #[tokio::test]
    async fn forwards_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(path("/repos/acme/widgets"))
            .and(header("authorization", "Bearer t0ken"))
            .and(header("accept", GITHUB_ACCEPT))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"default_branch": "main"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/repos/acme/widgets/git/trees/main"))
            .and(header("authorization", "Bearer t0ken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tree_json()))
            .expect(1)
            .mount(&server)
            .await;
        let discoverer = GitHubRepoDiscoverer::new(config(&server)).unwrap();
        let mut opts = ScraperOptions::new(REPO, "widgets", "");
        opts.headers.insert("Authorization".into(), "Bearer t0ken".into());

        process(&discoverer, REPO, 0, &opts).await.unwrap();
    }

    #[tokio::test]
    async fn full_crawl_produces_file_documents() {
        let server = MockServer::start().await;
        mount_repo(&server).await;
        for (file, body) in [
            ("README.md", "# Widgets\n"),
            ("docs/guide.md", "# Guide\n"),
            ("src/lib.rs", "pub fn widget() {}\n"),
        ] {
            Mock::given(path(format!("/raw/acme/widgets/main/{file}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let strategy = CrawlStrategy::new(GitHubRepoDiscoverer::new(config(&server)).unwrap());
        let recorder = Recorder::default();
        let mut opts = ScraperOptions::new(REPO, "widgets", "");
        opts.exclude_patterns = vec!["src/**".into()];
        strategy.scrape(&opts, &recorder, None).await.unwrap();

        let events = recorder.events.lock().unwrap();
        let paths: Vec<String> = events
            .iter()
            .filter_map(|e| e.document.as_ref().and_then(|d| d.metadata.path.clone()))
            .collect();
        assert_eq!(paths, vec!["README.md", "docs/guide.md"]);
        assert_eq!(events.len(), 3);
    }
}
