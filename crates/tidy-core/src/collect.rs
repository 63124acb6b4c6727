//! Loads every piece of branch data upfront so the interactive part of a run
//! never waits on git or the network.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::classifier::{CategorizedPlan, ClassifiedBranch, ClassifyInput, Classifier};
use crate::error::Result;
use crate::git::{self, Git};
use crate::github::MergeLookup;
use crate::types::RemotePresence;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub default_branch: String,
    pub plan: CategorizedPlan,
    /// Remote presence for every classified local branch, keyed by name.
    pub presence: BTreeMap<String, RemotePresence>,
    /// Commits since the fork point, for stale branches only.
    pub recent_commits: BTreeMap<String, Vec<String>>,
    /// False when no PR lookup was available (merged/remote-only are empty).
    pub merge_lookup: bool,
}

/// A stale branch with the context shown before asking about it.
pub struct StaleReview<'a> {
    pub branch: &'a ClassifiedBranch,
    pub commits: &'a [String],
    pub presence: RemotePresence,
}

impl Snapshot {
    /// Unknown branches report no remote presence.
    pub fn presence_of(&self, name: &str) -> RemotePresence {
        self.presence.get(name).copied().unwrap_or_default()
    }

    pub fn stale_reviews(&self) -> Vec<StaleReview<'_>> {
        self.plan
            .stale
            .iter()
            .map(|branch| StaleReview {
                branch,
                commits: self
                    .recent_commits
                    .get(&branch.name)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
                presence: self.presence_of(&branch.name),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub struct CollectOptions<'a> {
    pub default_branch: &'a str,
    pub stale_days: u32,
    pub protected: &'a [String],
    pub workers: usize,
}

pub fn load_snapshot(
    git: Arc<dyn Git>,
    lookup: Option<&dyn MergeLookup>,
    opts: &CollectOptions,
    now: DateTime<Utc>,
) -> Result<Snapshot> {
    tracing::info!("fetching remotes");
    if let Err(e) = git.run(&["fetch", "--all", "--prune"]) {
        tracing::warn!(error = %e, "fetch failed, classifying against local remote refs");
    }

    let local = git::local_branches(git.as_ref())?;
    let remote = git::remote_branches(git.as_ref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not list remote branches");
        Vec::new()
    });

    let merged: Option<HashSet<String>> = lookup.and_then(|l| match l.merged_heads() {
        Ok(heads) => Some(heads),
        Err(e) => {
            tracing::warn!(error = %e, "PR merge check disabled");
            None
        }
    });

    let input = ClassifyInput {
        local: &local,
        remote: &remote,
        default_branch: opts.default_branch,
        merged: merged.as_ref(),
        stale_days: opts.stale_days,
        protected: opts.protected,
    };
    let plan = Classifier::default().classify(&input, now);
    tracing::info!(
        gone = plan.gone.len(),
        merged = plan.merged.len(),
        remote_only = plan.remote_only.len(),
        stale = plan.stale.len(),
        "classified branches"
    );

    let recent_commits = plan
        .stale
        .iter()
        .map(|b| {
            (
                b.name.clone(),
                git::recent_commits(git.as_ref(), opts.default_branch, &b.name),
            )
        })
        .collect();

    let names: Vec<String> = plan.local_names().into_iter().map(str::to_string).collect();
    let presence = check_remotes(Arc::clone(&git), names, opts.workers)?;

    Ok(Snapshot {
        default_branch: opts.default_branch.to_string(),
        plan,
        presence,
        recent_commits,
        merge_lookup: merged.is_some(),
    })
}

/// Probe remote presence for each branch on a bounded worker pool. Results
/// come back in completion order and are re-keyed by name; a failed worker
/// leaves its branch out, which callers read as "on no remote".
pub fn check_remotes(
    git: Arc<dyn Git>,
    branches: Vec<String>,
    workers: usize,
) -> Result<BTreeMap<String, RemotePresence>> {
    if branches.is_empty() {
        return Ok(BTreeMap::new());
    }
    let workers = workers.max(1);
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers.min(branches.len()))
        .max_blocking_threads(workers)
        .enable_all()
        .build()?;

    let results = rt.block_on(async move {
        let permits = Arc::new(Semaphore::new(workers));
        let mut set = JoinSet::new();

        for name in branches {
            let git = Arc::clone(&git);
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let probe = name.clone();
                let presence =
                    tokio::task::spawn_blocking(move || git::remote_presence(git.as_ref(), &probe))
                        .await;
                (name, presence)
            });
        }

        let mut out = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Ok(presence))) => {
                    out.insert(name, presence);
                }
                Ok((name, Err(e))) => {
                    tracing::warn!(branch = %name, error = %e, "remote check failed");
                }
                Err(e) => tracing::warn!(error = %e, "remote check task failed"),
            }
        }
        out
    });

    Ok(results)
}
