//! Invocation of the `git` executable and the read-only queries built on it.
//!
//! Everything that touches the repository goes through the [`Git`] trait so the
//! planner, deleter and sync logic can run against a recording fake in tests.
//!
//! # Dry run
//! [`SystemGit`] always runs read-only subcommands (see [`is_mutating`]). When
//! `dry_run` is set, mutating subcommands are logged and return empty output
//! without spawning anything. `fetch` counts as a read: it only refreshes
//! remote-tracking refs, and a dry run must classify against the same refs as
//! a real one.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::branch::{
    parse_local_branches, parse_remaining_branches, parse_remote_branches, LocalBranch,
    RemainingBranch, RemoteBranch, LOCAL_BRANCH_FORMAT, REMAINING_BRANCH_FORMAT,
};
use crate::error::{Result, TidyError};
use crate::types::{Remote, RemotePresence};

pub const FALLBACK_DEFAULT_BRANCH: &str = "main";
pub const STASH_MESSAGE: &str = "git-tidy auto-stash";
const RECENT_COMMIT_LIMIT: &str = "-15";

// ---------------------------------------------------------------------------
// Git trait
// ---------------------------------------------------------------------------

pub trait Git: Send + Sync {
    /// Run `git <args>`, returning stdout. A non-zero exit is an error.
    fn run(&self, args: &[&str]) -> Result<String>;

    /// Whether mutating commands are being suppressed.
    fn dry_run(&self) -> bool {
        false
    }

    /// Run `git <args>`, mapping any failure to `None`.
    fn try_run(&self, args: &[&str]) -> Option<String> {
        match self.run(args) {
            Ok(out) => Some(out),
            Err(e) => {
                tracing::debug!(error = %e, "git query failed");
                None
            }
        }
    }
}

/// True when `git <args>` would change local branches, the working tree, the
/// stash or a remote.
pub fn is_mutating(args: &[&str]) -> bool {
    match args.first().copied() {
        Some("rev-parse" | "symbolic-ref" | "remote" | "for-each-ref" | "ls-remote" | "log"
        | "merge-base" | "status" | "fetch") => false,
        Some("branch") => args
            .iter()
            .any(|a| matches!(*a, "-d" | "-D" | "--delete" | "-m" | "-M" | "--move")),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// SystemGit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SystemGit {
    workdir: PathBuf,
    dry_run: bool,
}

impl SystemGit {
    /// Open the working tree at `root`. Fails when `git` is not installed or
    /// `root` has no `.git` entry (a directory, or a file for worktrees).
    pub fn open(root: &Path, dry_run: bool) -> Result<Self> {
        which::which("git").map_err(|_| TidyError::GitNotFound)?;
        if !root.join(".git").exists() {
            return Err(TidyError::NotARepository(root.to_path_buf()));
        }
        Ok(Self {
            workdir: root.to_path_buf(),
            dry_run,
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl Git for SystemGit {
    fn run(&self, args: &[&str]) -> Result<String> {
        let joined = args.join(" ");
        if self.dry_run && is_mutating(args) {
            tracing::info!(command = %joined, "[dry-run] skipping git");
            return Ok(String::new());
        }
        tracing::debug!(command = %joined, "git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TidyError::GitFailed {
                args: joined,
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn current_branch(git: &dyn Git) -> Result<String> {
    Ok(git
        .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
        .trim()
        .to_string())
}

/// The branch `origin/HEAD` points at, or `main` when it is not set.
pub fn default_branch(git: &dyn Git) -> String {
    let detected = git
        .try_run(&["symbolic-ref", "refs/remotes/origin/HEAD"])
        .and_then(|out| {
            out.trim()
                .strip_prefix("refs/remotes/origin/")
                .map(str::to_string)
        })
        .filter(|name| !name.is_empty());
    match detected {
        Some(name) => name,
        None => {
            tracing::warn!(
                "could not detect default branch, using '{FALLBACK_DEFAULT_BRANCH}'"
            );
            FALLBACK_DEFAULT_BRANCH.to_string()
        }
    }
}

pub fn remotes(git: &dyn Git) -> Vec<String> {
    git.try_run(&["remote"])
        .map(|out| out.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
        .unwrap_or_default()
}

pub fn remote_url(git: &dyn Git, remote: &str) -> Option<String> {
    git.try_run(&["remote", "get-url", remote])
        .map(|out| out.trim().to_string())
        .filter(|url| !url.is_empty())
}

pub fn is_dirty(git: &dyn Git) -> Result<bool> {
    Ok(!git.run(&["status", "--porcelain"])?.trim().is_empty())
}

pub fn local_branch_exists(git: &dyn Git, branch: &str) -> bool {
    let refname = format!("refs/heads/{branch}");
    git.try_run(&["rev-parse", "--verify", "--quiet", &refname])
        .is_some()
}

pub fn local_branches(git: &dyn Git) -> Result<Vec<LocalBranch>> {
    let out = git.run(&["for-each-ref", LOCAL_BRANCH_FORMAT, "refs/heads/"])?;
    parse_local_branches(&out)
}

pub fn remote_branches(git: &dyn Git) -> Result<Vec<RemoteBranch>> {
    let out = git.run(&["branch", "-r"])?;
    Ok(parse_remote_branches(&out))
}

/// Probe each known remote for `refs/heads/<branch>`. Any failure counts as
/// absent.
pub fn remote_presence(git: &dyn Git, branch: &str) -> RemotePresence {
    let refname = format!("refs/heads/{branch}");
    let mut presence = RemotePresence::default();
    for remote in Remote::all() {
        let found = git
            .try_run(&["ls-remote", "--heads", remote.as_str(), &refname])
            .is_some_and(|out| !out.trim().is_empty());
        match remote {
            Remote::Origin => presence.origin = found,
            Remote::Upstream => presence.upstream = found,
        }
    }
    presence
}

/// Up to 15 one-line commits on `branch` since it forked from `default`.
/// Empty when the two share no history.
pub fn recent_commits(git: &dyn Git, default: &str, branch: &str) -> Vec<String> {
    let Some(base) = git
        .try_run(&["merge-base", default, branch])
        .map(|out| out.trim().to_string())
        .filter(|b| !b.is_empty())
    else {
        return Vec::new();
    };
    let range = format!("{base}..{branch}");
    git.try_run(&["log", "--oneline", "--no-decorate", &range, RECENT_COMMIT_LIMIT])
        .map(|out| {
            out.lines()
                .map(str::trim_end)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Local branches most-recently-committed first, minus `exclude`.
pub fn remaining_branches(
    git: &dyn Git,
    exclude: &dyn Fn(&str) -> bool,
) -> Result<Vec<RemainingBranch>> {
    let out = git.run(&[
        "for-each-ref",
        REMAINING_BRANCH_FORMAT,
        "--sort=-committerdate",
        "refs/heads/",
    ])?;
    let current = current_branch(git).unwrap_or_default();
    Ok(parse_remaining_branches(&out, &current, exclude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGit;

    #[test]
    fn read_only_commands_are_not_mutating() {
        assert!(!is_mutating(&["rev-parse", "HEAD"]));
        assert!(!is_mutating(&["branch", "-r"]));
        assert!(!is_mutating(&["ls-remote", "--heads", "origin", "x"]));
        assert!(!is_mutating(&["status", "--porcelain"]));
        assert!(!is_mutating(&["fetch", "--all", "--prune"]));
    }

    #[test]
    fn destructive_commands_are_mutating() {
        assert!(is_mutating(&["branch", "-D", "x"]));
        assert!(is_mutating(&["push", "origin", "--delete", "x"]));
        assert!(is_mutating(&["checkout", "main"]));
        assert!(is_mutating(&["stash", "push", "-u"]));
        assert!(is_mutating(&[]));
    }

    #[test]
    fn open_rejects_plain_directory() {
        if which::which("git").is_err() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let err = SystemGit::open(dir.path(), false).unwrap_err();
        assert!(matches!(err, TidyError::NotARepository(_)));
    }

    #[test]
    fn default_branch_from_origin_head() {
        let git = FakeGit::new().respond(
            &["symbolic-ref", "refs/remotes/origin/HEAD"],
            "refs/remotes/origin/develop\n",
        );
        assert_eq!(default_branch(&git), "develop");
    }

    #[test]
    fn default_branch_keeps_slashes() {
        let git = FakeGit::new().respond(
            &["symbolic-ref", "refs/remotes/origin/HEAD"],
            "refs/remotes/origin/release/main\n",
        );
        assert_eq!(default_branch(&git), "release/main");
    }

    #[test]
    fn default_branch_falls_back_to_main() {
        let git = FakeGit::new().fail(&["symbolic-ref", "refs/remotes/origin/HEAD"], "not a ref");
        assert_eq!(default_branch(&git), "main");
    }

    #[test]
    fn remote_presence_treats_failures_as_absent() {
        let git = FakeGit::new()
            .respond(
                &["ls-remote", "--heads", "origin", "refs/heads/feature"],
                "abc123\trefs/heads/feature\n",
            )
            .fail(
                &["ls-remote", "--heads", "upstream", "refs/heads/feature"],
                "fatal: 'upstream' does not appear to be a git repository",
            );
        let p = remote_presence(&git, "feature");
        assert!(p.origin);
        assert!(!p.upstream);
    }

    #[test]
    fn recent_commits_empty_without_merge_base() {
        let git = FakeGit::new().fail(&["merge-base", "main", "orphan"], "no merge base");
        assert!(recent_commits(&git, "main", "orphan").is_empty());
    }

    #[test]
    fn recent_commits_lists_log_lines() {
        let git = FakeGit::new()
            .respond(&["merge-base", "main", "feature"], "base0\n")
            .respond(
                &["log", "--oneline", "--no-decorate", "base0..feature", "-15"],
                "c2 second\nc1 first\n",
            );
        assert_eq!(
            recent_commits(&git, "main", "feature"),
            vec!["c2 second".to_string(), "c1 first".to_string()]
        );
    }

    #[test]
    fn remaining_branches_marks_current() {
        let git = FakeGit::new()
            .respond(
                &[
                    "for-each-ref",
                    REMAINING_BRANCH_FORMAT,
                    "--sort=-committerdate",
                    "refs/heads/",
                ],
                "main\t1 hour ago\tBump\nwip\t2 days ago\tWIP\n",
            )
            .respond(&["rev-parse", "--abbrev-ref", "HEAD"], "wip\n");
        let rows = remaining_branches(&git, &|n| n == "main").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_current);
    }
}
