//! URL scoping: include/exclude patterns, subpage and host restrictions, normalization.

use regex::Regex;
use url::Url;

use docscout_shared::{Result, ScrapeScope, ScraperError};

// ---------------------------------------------------------------------------
// Include / exclude patterns
// ---------------------------------------------------------------------------

/// Compiled include/exclude patterns for one job.
///
/// Patterns are globs (`*` within a segment, `**` across segments, `?` one
/// character) or, when wrapped in slashes, regular expressions.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PatternFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// Whether any of `candidates` (path forms of one resource) passes.
    ///
    /// Exclusion is evaluated independently of inclusion: a candidate set that
    /// satisfies an include pattern is still dropped by a matching exclude.
    pub fn allows(&self, candidates: &[&str]) -> bool {
        let hit = |patterns: &[Regex]| {
            patterns
                .iter()
                .any(|re| candidates.iter().any(|c| re.is_match(c)))
        };

        if hit(&self.exclude) {
            return false;
        }
        self.include.is_empty() || hit(&self.include)
    }

    /// Convenience for a single path, also tried without its leading slash.
    pub fn allows_path(&self, path: &str) -> bool {
        self.allows(&[path, path.trim_start_matches('/')])
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| compile_pattern(p.trim()))
        .collect()
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        let inner = &pattern[1..pattern.len() - 1];
        return Regex::new(inner)
            .map_err(|e| ScraperError::config(format!("invalid regex pattern {pattern}: {e}")));
    }
    glob_to_regex(pattern)
        .ok_or_else(|| ScraperError::config(format!("invalid glob pattern: {pattern}")))
}

/// Convert a glob-like pattern to an anchored regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*/", "(?:.*/)?")
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", "[^/]");
    Regex::new(&format!("^{escaped}$")).ok()
}

// ---------------------------------------------------------------------------
// Path and host scope
// ---------------------------------------------------------------------------

/// Whether `link` is nested under the seed URL's path on the same origin.
pub fn is_subpage(seed: &Url, link: &Url) -> bool {
    if seed.scheme() != link.scheme()
        || seed.host_str() != link.host_str()
        || seed.port_or_known_default() != link.port_or_known_default()
    {
        return false;
    }

    let base = base_directory(seed.path());
    let path = link.path();
    path.starts_with(&base) || path.trim_end_matches('/') == base.trim_end_matches('/')
}

/// Directory prefix that subpages of `path` must share.
///
/// `/docs/` and `/docs` both yield `/docs/`; a file-looking last segment such as
/// `/docs/index.html` yields its directory. Archive files act as directories.
fn base_directory(path: &str) -> String {
    if path.ends_with('/') {
        return path.to_string();
    }
    let last = path.rsplit('/').next().unwrap_or("");
    let is_archive = [".zip", ".tar", ".tgz", ".tar.gz"]
        .iter()
        .any(|ext| last.to_ascii_lowercase().ends_with(ext));

    if last.contains('.') && !is_archive {
        match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => "/".to_string(),
        }
    } else {
        format!("{path}/")
    }
}

/// Host restriction for web links.
pub fn in_host_scope(seed: &Url, link: &Url, scope: ScrapeScope) -> bool {
    let (Some(seed_host), Some(link_host)) = (host_of(seed), host_of(link)) else {
        return false;
    };
    match scope {
        ScrapeScope::Subpages => is_subpage(seed, link),
        ScrapeScope::Hostname => seed_host == link_host,
        ScrapeScope::Domain => base_domain(&seed_host) == base_domain(&link_host),
    }
}

/// Lowercased host with any `www.` prefix removed.
fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let h = h.to_ascii_lowercase();
        h.strip_prefix("www.").map(str::to_string).unwrap_or(h)
    })
}

/// Last two labels of a host name (`docs.example.com` → `example.com`).
fn base_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        host.to_string()
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Options for [`normalize_url_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub remove_query: bool,
    pub ignore_case: bool,
}

/// Dedup key for a URL: fragment removed, trailing slash trimmed (except root).
pub fn normalize_url(url: &str) -> String {
    normalize_url_with(url, NormalizeOptions::default())
}

/// Dedup key with optional query stripping and case folding.
///
/// Unparseable input is returned trimmed, so it still dedups against itself.
pub fn normalize_url_with(url: &str, opts: NormalizeOptions) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.trim().to_string();
    };
    parsed.set_fragment(None);
    if opts.remove_query {
        parsed.set_query(None);
    }

    let mut s = parsed.to_string();
    if s.ends_with('/') && parsed.path() != "/" {
        s.pop();
    }
    if opts.ignore_case {
        s = s.to_lowercase();
    }
    s
}
