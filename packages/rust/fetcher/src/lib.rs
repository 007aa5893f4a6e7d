//! Fetch collaborators: turn a URL into [`RawContent`].
//!
//! - [`HttpFetcher`] - `http(s)://` via `reqwest`, with retry and cancellation
//! - [`FileFetcher`] - `file://` paths, including entries inside archives
//! - [`archive`] - zip/tar listing and single-entry extraction
//!
//! Fetchers distinguish "the resource does not exist" ([`FetchStatus::NotFound`])
//! from transport failures (`Err`), which callers classify further.

pub mod archive;
mod file;
mod http;

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use async_trait::async_trait;
use docscout_shared::{CancellationToken, RawContent, Result, ScraperError};

pub use file::{FileFetcher, file_url_to_path, path_to_file_url};
pub use http::HttpFetcher;

#[doc(no_inline)]
pub use docscout_shared::FetchStatus;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Per-request options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Headers forwarded verbatim.
    pub headers: HashMap<String, String>,
    /// Job cancellation handle; in-flight requests abort when it fires.
    pub signal: Option<CancellationToken>,
    pub follow_redirects: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            signal: None,
            follow_redirects: true,
        }
    }
}

/// Something that can retrieve raw bytes for a URL.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Whether this fetcher understands the URL's scheme.
    fn can_fetch(&self, url: &str) -> bool;

    /// Fetch `url`. Missing resources return `Ok` with `NotFound` status.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawContent>;

    /// Release transport resources. Called once per job.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Await `fut` unless `signal` fires first, in which case return [`ScraperError::Cancelled`].
pub async fn cancellable<T, F>(signal: Option<&CancellationToken>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match signal {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ScraperError::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}

// ---------------------------------------------------------------------------
// Mime detection
// ---------------------------------------------------------------------------

/// Extensionless file names that are always text.
const TEXT_FILE_NAMES: &[&str] = &[
    "readme",
    "license",
    "licence",
    "changelog",
    "contributing",
    "authors",
    "notice",
    "dockerfile",
    "makefile",
    "rakefile",
    "gemfile",
    "procfile",
    "vagrantfile",
    "jenkinsfile",
    "codeowners",
];

/// Guess a mime type from a file path.
///
/// `mime_guess` misclassifies several source extensions (`.ts` is MPEG
/// transport stream there), so common documentation and code types are
/// resolved first.
pub fn mime_for_path(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let Some(ext) = ext else {
        // Extensionless names and dotfiles (`.env`, `.eslintrc`) are configs or prose.
        return "text/plain".into();
    };

    let known = match ext.as_str() {
        "md" | "mdx" | "markdown" => "text/markdown",
        "html" | "htm" | "xhtml" => "text/html",
        "txt" | "rst" | "adoc" | "text" => "text/plain",
        "json" | "jsonc" => "application/json",
        "yaml" | "yml" => "text/yaml",
        "toml" => "text/x-toml",
        "ts" | "tsx" | "mts" | "cts" => "text/x-typescript",
        "js" | "jsx" | "mjs" | "cjs" => "text/javascript",
        "rs" => "text/x-rust",
        "py" | "pyi" => "text/x-python",
        "go" => "text/x-go",
        "java" => "text/x-java",
        "kt" | "kts" => "text/x-kotlin",
        "rb" => "text/x-ruby",
        "c" | "h" => "text/x-c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "text/x-c++",
        "cs" => "text/x-csharp",
        "swift" => "text/x-swift",
        "php" => "text/x-php",
        "sh" | "bash" | "zsh" => "text/x-shellscript",
        "css" | "scss" | "sass" | "less" => "text/css",
        "xml" | "svg" => "text/xml",
        "sql" => "text/x-sql",
        "ini" | "cfg" | "conf" | "properties" | "env" => "text/plain",
        "proto" => "text/x-protobuf",
        "graphql" | "gql" => "text/x-graphql",
        "dart" => "text/x-dart",
        "scala" | "sc" => "text/x-scala",
        "gradle" | "groovy" => "text/x-groovy",
        // Component files mix markup and code; keep them verbatim.
        "vue" | "svelte" | "astro" => "text/plain",
        // go.mod, go.sum, Cargo.lock and friends.
        "mod" | "sum" | "lock" | "csv" | "tsv" => "text/plain",
        _ => "",
    };
    if !known.is_empty() {
        return known.into();
    }

    // Unknown extensions are treated as text; binary bodies are caught by content sniffing.
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or("text/plain")
        .to_string()
}

/// Whether `name` (no directories) is a well-known extensionless text file.
pub fn is_known_text_file_name(name: &str) -> bool {
    TEXT_FILE_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_overrides_source_extensions() {
        assert_eq!(mime_for_path("src/cli/types.ts"), "text/x-typescript");
        assert_eq!(mime_for_path("docs/guide.md"), "text/markdown");
        assert_eq!(mime_for_path("lib.rs"), "text/x-rust");
        assert_eq!(mime_for_path("package.json"), "application/json");
    }

    #[test]
    fn mime_falls_back_to_guess() {
        assert_eq!(mime_for_path("logo.png"), "image/png");
        assert_eq!(mime_for_path("Dockerfile"), "text/plain");
        assert_eq!(mime_for_path(".eslintrc"), "text/plain");
    }

    #[test]
    fn source_and_lock_files_are_text() {
        for path in [
            "api/service.proto",
            "schema.graphql",
            "go.mod",
            "go.sum",
            "Cargo.lock",
            "src/App.vue",
            "build.gradle",
            "lib/main.dart",
            "src/Main.scala",
            "notes.somethingnew",
        ] {
            assert!(mime_for_path(path).starts_with("text/"), "{path}: {}", mime_for_path(path));
        }
    }

    #[test]
    fn known_text_names_are_case_insensitive() {
        assert!(is_known_text_file_name("Makefile"));
        assert!(is_known_text_file_name("README"));
        assert!(!is_known_text_file_name("main"));
    }

    #[tokio::test]
    async fn cancellable_aborts_on_fired_token() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<()> = cancellable(Some(&token), std::future::pending()).await;
        assert!(matches!(result, Err(ScraperError::Cancelled)));
    }
}
