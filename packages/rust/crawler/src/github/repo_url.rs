//! GitHub URL shapes.

use url::Url;

use docscout_shared::{Result, ScraperError};

const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Legacy scheme kept so older persisted jobs still resolve.
pub const LEGACY_FILE_SCHEME: &str = "github-file://";

/// Path shape of a `github.com` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubUrlKind {
    /// `/{owner}/{repo}`
    Repo,
    /// `/{owner}/{repo}/tree/{branch}[/{path}]`
    Tree,
    /// `/{owner}/{repo}/blob/{branch}/{path}`
    Blob,
    /// `/{owner}/{repo}/wiki[/...]`
    Wiki,
}

/// Classify a URL. `None` for other hosts, unparseable input, or other repo pages.
pub fn classify(url: &str) -> Option<GitHubUrlKind> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    if !GITHUB_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let segments = path_segments(&parsed);
    match segments.as_slice() {
        [_, _] => Some(GitHubUrlKind::Repo),
        [_, _, "tree", _, ..] => Some(GitHubUrlKind::Tree),
        [_, _, "blob", _, _, ..] => Some(GitHubUrlKind::Blob),
        [_, _, "wiki", ..] => Some(GitHubUrlKind::Wiki),
        _ => None,
    }
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default()
}

/// Owner, repository and optional branch/path parsed from a seed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubUrlInfo {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    /// Directory restriction from a `/tree/{branch}/{path}` URL.
    pub sub_path: Option<String>,
    /// Single file from a `/blob/{branch}/{path}` URL.
    pub file_path: Option<String>,
    pub is_blob: bool,
}

impl GitHubUrlInfo {
    /// Parse a repo, tree, blob or wiki URL.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| ScraperError::invalid_url(url, e.to_string()))?;
        if classify(url).is_none() {
            return Err(ScraperError::invalid_url(
                url,
                "expected https://github.com/{owner}/{repo}[/tree|/blob/...]",
            ));
        }

        let segments = path_segments(&parsed);
        let owner = segments[0].to_string();
        let repo = segments[1].trim_end_matches(".git").to_string();
        let rest = |from: usize| {
            let joined = segments.get(from..).map(|s| s.join("/")).unwrap_or_default();
            (!joined.is_empty()).then_some(joined)
        };

        let mut info = Self {
            owner,
            repo,
            branch: None,
            sub_path: None,
            file_path: None,
            is_blob: false,
        };
        match segments.get(2).copied() {
            Some("tree") => {
                info.branch = segments.get(3).map(|s| s.to_string());
                info.sub_path = rest(4);
            }
            Some("blob") => {
                info.branch = segments.get(3).map(|s| s.to_string());
                info.file_path = rest(4);
                info.is_blob = true;
            }
            _ => {}
        }
        Ok(info)
    }

    /// `https://github.com/{owner}/{repo}`
    pub fn repo_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }

    pub fn blob_url(&self, branch: &str, path: &str) -> String {
        format!(
            "https://github.com/{}/{}/blob/{branch}/{path}",
            self.owner, self.repo
        )
    }
}

/// Repository-relative path of a blob URL, if it belongs to `owner/repo`.
pub fn blob_path(url: &Url, owner: &str, repo: &str) -> Option<String> {
    let segments = path_segments(url);
    match segments.as_slice() {
        [o, r, "blob", _, rest @ ..]
            if o.eq_ignore_ascii_case(owner) && r.eq_ignore_ascii_case(repo) && !rest.is_empty() =>
        {
            Some(rest.join("/"))
        }
        _ => None,
    }
}

/// Whether `path` lies within `sub_path`. An unset or empty `sub_path` contains everything.
pub fn is_within_sub_path(path: &str, sub_path: Option<&str>) -> bool {
    let Some(sub) = sub_path.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) else {
        return true;
    };
    path == sub || path.starts_with(&format!("{sub}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_shapes() {
        assert_eq!(classify("https://github.com/acme/widgets"), Some(GitHubUrlKind::Repo));
        assert_eq!(classify("https://www.github.com/acme/widgets/"), Some(GitHubUrlKind::Repo));
        assert_eq!(
            classify("https://github.com/acme/widgets/tree/main/docs"),
            Some(GitHubUrlKind::Tree)
        );
        assert_eq!(
            classify("https://github.com/acme/widgets/blob/main/README.md"),
            Some(GitHubUrlKind::Blob)
        );
        assert_eq!(
            classify("https://github.com/acme/widgets/wiki/Home"),
            Some(GitHubUrlKind::Wiki)
        );
        assert_eq!(classify("https://github.com/acme/widgets/issues"), None);
        assert_eq!(classify("https://github.com/acme"), None);
        assert_eq!(classify("https://gitlab.com/acme/widgets"), None);
        assert_eq!(classify("::"), None);
    }

    #[test]
    fn parses_tree_and_blob() {
        let tree = GitHubUrlInfo::parse("https://github.com/acme/widgets/tree/dev/docs/guide").unwrap();
        assert_eq!(tree.branch.as_deref(), Some("dev"));
        assert_eq!(tree.sub_path.as_deref(), Some("docs/guide"));
        assert!(!tree.is_blob);

        let blob = GitHubUrlInfo::parse("https://github.com/acme/widgets/blob/main/src/lib.rs").unwrap();
        assert!(blob.is_blob);
        assert_eq!(blob.file_path.as_deref(), Some("src/lib.rs"));

        let base = GitHubUrlInfo::parse("https://github.com/acme/widgets.git").unwrap();
        assert_eq!(base.repo, "widgets");
        assert_eq!(base.branch, None);
    }

    #[test]
    fn rejects_non_repo_urls() {
        assert!(GitHubUrlInfo::parse("https://github.com/acme").is_err());
        assert!(GitHubUrlInfo::parse("https://example.com/acme/widgets").is_err());
    }

    #[test]
    fn sub_path_containment() {
        assert!(is_within_sub_path("docs/guide.md", Some("docs")));
        assert!(is_within_sub_path("docs/guide.md", Some("/docs/")));
        assert!(is_within_sub_path("docs", Some("docs")));
        assert!(is_within_sub_path("README.md", None));
        assert!(is_within_sub_path("README.md", Some("")));
        assert!(!is_within_sub_path("README.md", Some("docs")));
        assert!(!is_within_sub_path("docsite/a.md", Some("docs")));
    }

    #[test]
    fn blob_path_requires_same_repo() {
        let url = Url::parse("https://github.com/acme/widgets/blob/main/docs/a.md").unwrap();
        assert_eq!(blob_path(&url, "acme", "widgets").as_deref(), Some("docs/a.md"));
        assert_eq!(blob_path(&url, "acme", "other"), None);
    }
}
