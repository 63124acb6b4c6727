use crate::error::Result;
use crate::git::{self, Git, STASH_MESSAGE};
use crate::prompt::Prompt;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    UpToDate,
    FastForwarded,
    Rebased,
    /// Local commits exist and no rebase happened (declined, or dry run).
    Diverged,
    /// The upstream ref does not resolve; nothing was touched.
    NoUpstream,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub default_branch: String,
    pub upstream_ref: String,
    pub outcome: SyncOutcome,
    pub stashed: bool,
    /// The branch that was checked out before the sync and restored after.
    pub restored_branch: Option<String>,
}

/// Bring `default_branch` up to date with `upstream/<default>` (or
/// `origin/<default>` when there is no `upstream` remote).
///
/// Uncommitted changes are stashed before leaving the current branch. The
/// original branch and the stash are restored on every path, including when
/// a sync step fails; that failure is returned after restoration. When the
/// upstream ref does not resolve, nothing is touched and the outcome is
/// [`SyncOutcome::NoUpstream`].
pub fn sync_default_branch(
    git: &dyn Git,
    prompt: &mut dyn Prompt,
    default_branch: &str,
) -> Result<SyncReport> {
    let current = git::current_branch(git)?;
    let remote = if git::remotes(git).iter().any(|r| r == "upstream") {
        "upstream"
    } else {
        "origin"
    };
    let upstream_ref = format!("{remote}/{default_branch}");
    let switching = current != default_branch;

    let Some(upstream) = resolve(git, &upstream_ref) else {
        tracing::warn!("{upstream_ref} not found, skipping sync of {default_branch}");
        return Ok(SyncReport {
            default_branch: default_branch.to_string(),
            upstream_ref,
            outcome: SyncOutcome::NoUpstream,
            stashed: false,
            restored_branch: None,
        });
    };

    let stashed = if switching && git::is_dirty(git)? {
        tracing::warn!("working directory has uncommitted changes, stashing");
        git.run(&["stash", "push", "-u", "-m", STASH_MESSAGE])?;
        true
    } else {
        false
    };

    let synced = switch_and_update(
        git,
        prompt,
        switching,
        default_branch,
        &upstream_ref,
        &upstream,
    );

    let restored = restore(git, switching.then_some(current.as_str()), stashed);
    let outcome = synced?;
    restored?;

    Ok(SyncReport {
        default_branch: default_branch.to_string(),
        upstream_ref,
        outcome,
        stashed,
        restored_branch: switching.then_some(current),
    })
}

fn switch_and_update(
    git: &dyn Git,
    prompt: &mut dyn Prompt,
    switching: bool,
    default_branch: &str,
    upstream_ref: &str,
    upstream: &str,
) -> Result<SyncOutcome> {
    if switching {
        tracing::info!("switching to {default_branch}");
        git.run(&["checkout", default_branch])?;
    }
    update(git, prompt, default_branch, upstream_ref, upstream)
}

/// `upstream` is the commit `upstream_ref` resolved to before switching.
fn update(
    git: &dyn Git,
    prompt: &mut dyn Prompt,
    default_branch: &str,
    upstream_ref: &str,
    upstream: &str,
) -> Result<SyncOutcome> {
    let local = rev(git, default_branch)?;
    if local == upstream {
        tracing::info!("{default_branch} is up to date with {upstream_ref}");
        return Ok(SyncOutcome::UpToDate);
    }

    let base = git
        .run(&["merge-base", default_branch, upstream_ref])?
        .trim()
        .to_string();
    if base == local {
        return fast_forward(git, default_branch, upstream_ref);
    }

    let range = format!("{upstream_ref}..{default_branch}");
    let ahead = git.run(&["log", &range, "--oneline"])?;
    if ahead.trim().is_empty() {
        return fast_forward(git, default_branch, upstream_ref);
    }

    tracing::warn!("local {default_branch} has diverged from {upstream_ref}");
    if git.dry_run() {
        tracing::info!("[dry-run] would rebase {default_branch} onto {upstream_ref}");
        return Ok(SyncOutcome::Diverged);
    }
    if prompt.ask(&format!("Rebase {default_branch} onto {upstream_ref}?"), false) {
        git.run(&["rebase", upstream_ref])?;
        tracing::info!("{default_branch} rebased onto {upstream_ref}");
        Ok(SyncOutcome::Rebased)
    } else {
        Ok(SyncOutcome::Diverged)
    }
}

fn fast_forward(git: &dyn Git, default_branch: &str, upstream_ref: &str) -> Result<SyncOutcome> {
    tracing::info!("fast-forwarding {default_branch} to {upstream_ref}");
    git.run(&["merge", "--ff-only", upstream_ref])?;
    Ok(SyncOutcome::FastForwarded)
}

fn rev(git: &dyn Git, refname: &str) -> Result<String> {
    Ok(git.run(&["rev-parse", refname])?.trim().to_string())
}

fn resolve(git: &dyn Git, refname: &str) -> Option<String> {
    git.try_run(&["rev-parse", refname])
        .map(|out| out.trim().to_string())
        .filter(|sha| !sha.is_empty())
}

/// Check out `branch` (if any) and pop the stash (if any). Both are attempted
/// even if the first fails; the first error wins.
fn restore(git: &dyn Git, branch: Option<&str>, stashed: bool) -> Result<()> {
    let switched_back = match branch {
        Some(b) => {
            tracing::info!("switching back to {b}");
            git.run(&["checkout", b]).map(|_| ())
        }
        None => Ok(()),
    };
    let popped = if stashed {
        tracing::info!("restoring stashed changes");
        git.run(&["stash", "pop"]).map(|_| ())
    } else {
        Ok(())
    };
    switched_back.and(popped)
}
