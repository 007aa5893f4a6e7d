//! `file://` fetcher for local files and archive entries.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use docscout_shared::{FetchStatus, RawContent, Result, ScraperError};

use crate::{ContentFetcher, FetchOptions, archive, cancellable, mime_for_path};

/// Reads local files. Paths nested under an archive file read that entry.
#[derive(Debug, Default, Clone)]
pub struct FileFetcher;

impl FileFetcher {
    pub fn new() -> Self {
        Self
    }
}

/// Convert a `file://` URL into a filesystem path.
pub fn file_url_to_path(url: &str) -> Result<PathBuf> {
    let parsed = Url::parse(url).map_err(|e| ScraperError::invalid_url(url, e.to_string()))?;
    if parsed.scheme() != "file" {
        return Err(ScraperError::invalid_url(url, "expected a file:// URL"));
    }
    parsed
        .to_file_path()
        .map_err(|_| ScraperError::invalid_url(url, "not a local file path"))
}

async fn read_path(url: &str, path: PathBuf) -> Result<RawContent> {
    let mime_type = mime_for_path(&path.to_string_lossy());

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {
            let content = tokio::fs::read(&path)
                .await
                .map_err(|e| ScraperError::io(&path, e))?;
            return Ok(RawContent {
                content,
                mime_type,
                source: url.to_string(),
                charset: None,
                status: FetchStatus::Success,
            });
        }
        Ok(_) => {
            return Err(ScraperError::io(
                &path,
                std::io::Error::other("path is a directory, not a file"),
            ));
        }
        // A path below an archive file stats as "not a directory".
        Err(e)
            if !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
            ) =>
        {
            return Err(ScraperError::io(&path, e));
        }
        Err(_) => {}
    }

    // Not on disk: maybe an entry inside an archive ancestor.
    let lookup = path.clone();
    let entry = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
        match archive::split_archive_path(&lookup) {
            Some((archive_path, entry)) => archive::read_entry(&archive_path, &entry),
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| ScraperError::Network(format!("archive read task failed: {e}")))??;

    match entry {
        Some(content) => Ok(RawContent {
            content,
            mime_type,
            source: url.to_string(),
            charset: None,
            status: FetchStatus::Success,
        }),
        None => {
            debug!(path = %path.display(), "file not found");
            Ok(RawContent::not_found(url))
        }
    }
}

#[async_trait]
impl ContentFetcher for FileFetcher {
    fn can_fetch(&self, url: &str) -> bool {
        url.starts_with("file://")
    }

    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawContent> {
        let path = file_url_to_path(url)?;
        cancellable(options.signal.as_ref(), read_path(url, path)).await
    }
}

/// Build a `file://` URL for a path, which must be absolute.
pub fn path_to_file_url(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(|u| u.to_string())
        .map_err(|_| ScraperError::invalid_url(path.display().to_string(), "path is not absolute"))
}
