//! Error types for docscout.
//!
//! Library crates use [`ScraperError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The seed URL could not be parsed or has an unusable shape.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// No registered strategy accepts the URL.
    #[error("no scraper strategy found for URL: {url}")]
    NoStrategy { url: String },

    /// Non-success HTTP status that is not a plain "not found".
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// Transport-level failure (DNS, connection reset, TLS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout.
    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error(
        "GitHub repository {owner}/{repo} not found or not accessible. \
         If it is private, set the GITHUB_TOKEN environment variable \
         (or pass an Authorization header)."
    )]
    GitHubNotFound { owner: String, repo: String },

    #[error("GitHub authentication failed for {url}: the token is invalid or expired")]
    GitHubAuth { url: String },

    #[error(
        "GitHub access denied for {url}: insufficient permissions or API rate limit exceeded"
    )]
    GitHubAccessDenied { url: String },

    /// The wiki page is missing or redirects away (wiki disabled or empty).
    #[error("GitHub wiki not available at {url}: {reason}")]
    WikiUnavailable { url: String, reason: String },

    /// Malformed API response, HTML, or other structured payload.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Unreadable or malformed archive.
    #[error("archive error at {path:?}: {message}")]
    Archive { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Content conversion error inside a pipeline.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The progress consumer rejected an event.
    #[error("progress callback failed: {0}")]
    Callback(String),

    /// An in-flight operation observed the job's cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScraperError>;

impl ScraperError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an archive error for the given archive path.
    pub fn archive(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Whether a fetcher may retry the operation that produced this error.
    ///
    /// Only transient transport conditions qualify. Configuration, access,
    /// parse and cancellation errors are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this error is a cooperative cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ScraperError::config("max_pages must be set");
        assert_eq!(err.to_string(), "config error: max_pages must be set");

        let err = ScraperError::NoStrategy {
            url: "ftp://example.com".into(),
        };
        assert!(err.to_string().contains("ftp://example.com"));
    }

    #[test]
    fn github_messages_are_actionable() {
        let err = ScraperError::GitHubNotFound {
            owner: "acme".into(),
            repo: "widgets".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not found or not accessible"));
        assert!(msg.contains("GITHUB_TOKEN"));

        let err = ScraperError::GitHubAuth {
            url: "https://api.github.com/repos/a/b".into(),
        };
        assert!(err.to_string().contains("GitHub authentication failed"));

        let err = ScraperError::GitHubAccessDenied {
            url: "https://api.github.com/repos/a/b".into(),
        };
        assert!(err.to_string().contains("GitHub access denied"));
    }

    #[test]
    fn retry_classification() {
        assert!(ScraperError::Network("reset".into()).is_retryable());
        assert!(ScraperError::Timeout { url: "x".into() }.is_retryable());
        assert!(ScraperError::Http { url: "x".into(), status: 503 }.is_retryable());
        assert!(ScraperError::Http { url: "x".into(), status: 429 }.is_retryable());
        assert!(!ScraperError::Http { url: "x".into(), status: 401 }.is_retryable());
        assert!(!ScraperError::Cancelled.is_retryable());
        assert!(!ScraperError::parse("bad json").is_retryable());
    }
}
