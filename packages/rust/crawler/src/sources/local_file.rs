//! Local directories, files and archives under `file://` URLs.
//!
//! A directory or an archive is a container: processing it yields one link per
//! child and no document. Container links end with `/` so pattern filters only
//! apply to files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use docscout_fetcher::{
    ContentFetcher, FetchOptions, FileFetcher, archive, file_url_to_path, path_to_file_url,
};
use docscout_pipeline::PipelineRegistry;
use docscout_shared::{
    CancellationToken, FetchStatus, QueueItem, Result, ScraperError, ScraperOptions,
};

use crate::content::extract_document;
use crate::engine::Discoverer;
use crate::strategy::{ProcessItemResult, SourceKind};

/// Directories never descended into.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    ".idea",
    ".vscode",
];

#[derive(Default)]
pub struct LocalFileDiscoverer {
    fetcher: FileFetcher,
    pipelines: PipelineRegistry,
}

impl LocalFileDiscoverer {
    pub fn new() -> Self {
        Self::default()
    }

    async fn list_directory(&self, dir: &Path) -> Result<Vec<String>> {
        let mut reader = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ScraperError::io(dir, e))?;

        let mut children: Vec<(PathBuf, bool)> = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ScraperError::io(dir, e))?
        {
            let name = entry.file_name();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ScraperError::io(entry.path(), e))?;
            if file_type.is_dir() && IGNORED_DIRS.contains(&name.to_string_lossy().as_ref()) {
                continue;
            }
            let is_container = file_type.is_dir() || archive::archive_kind(&entry.path()).is_some();
            children.push((entry.path(), is_container));
        }
        children.sort();

        children
            .into_iter()
            .map(|(path, is_container)| container_url(&path, is_container))
            .collect()
    }

    async fn list_archive(&self, path: &Path) -> Result<Vec<String>> {
        let owned = path.to_path_buf();
        let entries = tokio::task::spawn_blocking(move || archive::list_entries(&owned))
            .await
            .map_err(|e| ScraperError::archive(path, format!("listing task failed: {e}")))??;

        entries
            .iter()
            .map(|entry| path_to_file_url(&path.join(entry)))
            .collect()
    }
}

/// File URL for `path`, with a trailing slash when it is a container.
fn container_url(path: &Path, is_container: bool) -> Result<String> {
    let mut url = path_to_file_url(path)?;
    if is_container && !url.ends_with('/') {
        url.push('/');
    }
    Ok(url)
}

/// `link` relative to the seed directory, `/`-separated.
fn relative_path(seed: &Url, link: &Url) -> Option<String> {
    let seed_path = seed.to_file_path().ok()?;
    let link_path = link.to_file_path().ok()?;
    let rel = link_path.strip_prefix(&seed_path).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[async_trait]
impl Discoverer for LocalFileDiscoverer {
    fn kind(&self) -> SourceKind {
        SourceKind::LocalFile
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with("file://")
    }

    async fn process_item(
        &self,
        item: &QueueItem,
        options: &ScraperOptions,
        signal: &CancellationToken,
    ) -> Result<ProcessItemResult> {
        // Container URLs carry a trailing slash; stat the bare path.
        let path: PathBuf = file_url_to_path(&item.url)?.components().collect();

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                let links = self.list_directory(&path).await?;
                debug!(path = %path.display(), children = links.len(), "directory listed");
                return Ok(ProcessItemResult::links(links));
            }
            Ok(meta) if meta.is_file() && archive::archive_kind(&path).is_some() => {
                let links = self.list_archive(&path).await?;
                debug!(path = %path.display(), entries = links.len(), "archive listed");
                return Ok(ProcessItemResult::links(links));
            }
            _ => {}
        }

        let fetch_options = FetchOptions {
            headers: options.headers.clone(),
            signal: Some(signal.clone()),
            follow_redirects: options.follow_redirects,
        };
        let raw = self.fetcher.fetch(&item.url, &fetch_options).await?;
        if raw.status != FetchStatus::Success {
            debug!(url = %item.url, "file not found");
            return Ok(ProcessItemResult::not_found());
        }

        let rel = Url::parse(&options.url)
            .ok()
            .zip(Url::parse(&item.url).ok())
            .and_then(|(seed, link)| relative_path(&seed, &link))
            .filter(|p| !p.is_empty());
        let extracted = extract_document(&self.pipelines, &raw, &item.url, item, options, rel);

        Ok(ProcessItemResult {
            document: extracted.document,
            links: Vec::new(),
            status: FetchStatus::Success,
        })
    }

    /// Links must live under the seed path (directory or archive).
    fn is_in_scope(&self, seed: &Url, link: &Url, _options: &ScraperOptions) -> bool {
        if link.scheme() != "file" {
            return false;
        }
        let base = seed.path().trim_end_matches('/');
        let path = link.path();
        path == base || path.starts_with(&format!("{base}/"))
    }

    fn filter_target(&self, seed: &Url, link: &Url) -> Option<String> {
        if link.path().ends_with('/') {
            return None;
        }
        relative_path(seed, link).or_else(|| Some(link.path().to_string()))
    }
}
