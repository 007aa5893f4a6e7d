//! Which repository tree entries are worth fetching.

use std::path::Path;

use serde::Deserialize;

use docscout_fetcher::is_known_text_file_name;
use docscout_shared::ScraperOptions;

use crate::scope::PatternFilter;

/// One entry of `GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeResponse {
    pub sha: String,
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// Extensions that are never text, whatever the include patterns say.
const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "psd", "avif", "heic",
    // audio / video
    "mp3", "mp4", "wav", "ogg", "flac", "avi", "mov", "mkv", "webm", "m4a",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "war",
    // executables and libraries
    "exe", "dll", "so", "dylib", "a", "lib", "o", "obj", "bin", "class", "pyc", "wasm",
    // disk images and packages
    "dmg", "iso", "img", "msi", "deb", "rpm", "apk",
    // documents and fonts
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "woff", "woff2", "ttf", "otf", "eot",
    // data
    "db", "sqlite", "parquet",
];

/// Whether a tree entry should become a crawl link.
pub fn should_process_file(entry: &TreeEntry, filter: &PatternFilter) -> bool {
    if entry.kind == "tree" {
        return false;
    }
    looks_like_text(&entry.path) && filter.allows_path(&entry.path)
}

/// [`should_process_file`] with patterns compiled from `options`.
///
/// Invalid patterns reject everything.
pub fn should_process_file_with_options(entry: &TreeEntry, options: &ScraperOptions) -> bool {
    PatternFilter::new(&options.include_patterns, &options.exclude_patterns)
        .map(|filter| should_process_file(entry, &filter))
        .unwrap_or(false)
}

fn looks_like_text(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext {
        Some(ext) => !BINARY_EXTENSIONS.contains(&ext.as_str()),
        // Dotfiles (`.env`, `.eslintrc`) have no extension in this sense.
        None => name.starts_with('.') || is_known_text_file_name(name),
    }
}
