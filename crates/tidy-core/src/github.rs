//! Pull-request merge lookup against the GitHub REST API.
//!
//! The lookup is optional. Anything that prevents it (no GitHub remote, no
//! token, an API failure) is logged as a warning and the merged and
//! remote-only categories stay empty.

use crate::error::{Result, TidyError};
use crate::git::{remote_url, Git};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

pub const GITHUB_HOST: &str = "github.com";
pub const GITHUB_API: &str = "https://api.github.com";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const ENTERPRISE_HOST_ENV: &str = "GITHUB_ENTERPRISE_HOST";
pub const ENTERPRISE_TOKEN_ENV: &str = "GITHUB_ENTERPRISE_TOKEN";
const PER_PAGE: usize = 100;
const USER_AGENT: &str = concat!("git-tidy/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// RepoRef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

static REMOTE_RE: OnceLock<Regex> = OnceLock::new();

fn remote_re() -> &'static Regex {
    REMOTE_RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z+]+://)?(?:[^@/]+@)?([^:/]+)(?::\d+)?[:/](.+?)/([^/]+?)(?:\.git)?/?$")
            .unwrap()
    })
}

/// Parse `git@host:owner/repo.git`, `https://host/owner/repo.git` and
/// `ssh://git@host/owner/repo` style remote URLs.
pub fn parse_repo_slug(url: &str) -> Result<RepoRef> {
    let caps = remote_re()
        .captures(url.trim())
        .ok_or_else(|| TidyError::InvalidRemoteUrl(url.to_string()))?;
    Ok(RepoRef {
        host: caps[1].to_lowercase(),
        owner: caps[2].to_string(),
        name: caps[3].to_string(),
    })
}

// ---------------------------------------------------------------------------
// GithubTarget (detection)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubTarget {
    pub api_base: String,
    pub token: String,
    pub repo: RepoRef,
}

/// Work out which GitHub instance and repository to query. `upstream` is
/// preferred over `origin` so forks look at the parent repository.
pub fn detect(
    git: &dyn Git,
    env: &dyn Fn(&str) -> Option<String>,
    enterprise_host: Option<&str>,
) -> Option<GithubTarget> {
    let Some(url) = remote_url(git, "upstream").or_else(|| remote_url(git, "origin")) else {
        tracing::warn!("no origin or upstream remote, skipping PR merge check");
        return None;
    };

    let repo = match parse_repo_slug(&url) {
        Ok(repo) => repo,
        Err(e) => {
            tracing::warn!(error = %e, "skipping PR merge check");
            return None;
        }
    };

    let enterprise = enterprise_host
        .map(str::to_string)
        .or_else(|| env(ENTERPRISE_HOST_ENV))
        .map(|h| h.to_lowercase())
        .filter(|h| !h.is_empty());

    let (token_var, api_base) = if repo.host == GITHUB_HOST {
        (TOKEN_ENV, GITHUB_API.to_string())
    } else if enterprise.as_deref() == Some(repo.host.as_str()) {
        (ENTERPRISE_TOKEN_ENV, format!("https://{}/api/v3", repo.host))
    } else {
        tracing::warn!(host = %repo.host, "not a GitHub repository, skipping PR merge check");
        return None;
    };

    let Some(token) = env(token_var).filter(|t| !t.is_empty()) else {
        tracing::warn!("{token_var} not set, skipping PR merge check");
        return None;
    };

    tracing::debug!(repo = %repo.full_name(), api = %api_base, "using GitHub repository");
    Some(GithubTarget {
        api_base,
        token,
        repo,
    })
}

// ---------------------------------------------------------------------------
// MergeLookup
// ---------------------------------------------------------------------------

pub trait MergeLookup: Send + Sync {
    /// Head branch names of every merged pull request.
    fn merged_heads(&self) -> Result<HashSet<String>>;
}

#[derive(Debug, Deserialize)]
struct PullSummary {
    number: u64,
    merged_at: Option<String>,
    head: PullHead,
}

#[derive(Debug, Deserialize)]
struct PullHead {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

pub struct GithubClient {
    agent: ureq::Agent,
    target: GithubTarget,
    max_pages: u32,
}

impl GithubClient {
    pub fn new(target: GithubTarget, max_pages: u32) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            target,
            max_pages,
        }
    }

    pub fn target(&self) -> &GithubTarget {
        &self.target
    }

    fn closed_pulls(&self, page: u32) -> Result<Vec<PullSummary>> {
        let url = format!(
            "{}/repos/{}/{}/pulls",
            self.target.api_base.trim_end_matches('/'),
            self.target.repo.owner,
            self.target.repo.name
        );
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", self.target.token))
            .set("Accept", "application/vnd.github+json")
            .query("state", "closed")
            .query("sort", "created")
            .query("direction", "desc")
            .query("per_page", &PER_PAGE.to_string())
            .query("page", &page.to_string())
            .call();

        match response {
            Ok(resp) => resp
                .into_json::<Vec<PullSummary>>()
                .map_err(|e| TidyError::Github(format!("invalid pulls response: {e}"))),
            Err(ureq::Error::Status(code, resp)) => {
                let message = resp
                    .into_json::<ApiMessage>()
                    .map(|m| m.message)
                    .unwrap_or_default();
                Err(TidyError::Github(format!("HTTP {code} from {url}: {message}")))
            }
            Err(e) => Err(TidyError::Github(e.to_string())),
        }
    }
}

impl MergeLookup for GithubClient {
    fn merged_heads(&self) -> Result<HashSet<String>> {
        let mut heads = HashSet::new();
        let mut scanned = 0usize;

        for page in 1..=self.max_pages {
            let pulls = self.closed_pulls(page)?;
            let count = pulls.len();
            scanned += count;
            for pr in pulls {
                if pr.merged_at.is_some() && !pr.head.ref_name.is_empty() {
                    tracing::trace!(number = pr.number, head = %pr.head.ref_name, "merged PR");
                    heads.insert(pr.head.ref_name);
                }
            }
            if count < PER_PAGE {
                break;
            }
        }

        tracing::debug!(
            repo = %self.target.repo.full_name(),
            scanned,
            merged = heads.len(),
            "checked closed PRs"
        );
        Ok(heads)
    }
}
