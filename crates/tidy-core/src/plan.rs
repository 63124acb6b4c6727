use crate::collect::Snapshot;
use crate::prompt::Prompt;
use crate::types::{Category, Remote, RemotePresence};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DeletionDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionDecision {
    pub branch: String,
    pub category: Category,
    pub delete_origin: bool,
    pub delete_upstream: bool,
}

impl DeletionDecision {
    fn new(branch: &str, category: Category, presence: RemotePresence) -> Self {
        Self {
            branch: branch.to_string(),
            category,
            delete_origin: presence.origin,
            delete_upstream: presence.upstream,
        }
    }

    pub fn remotes(&self) -> Vec<Remote> {
        RemotePresence {
            origin: self.delete_origin,
            upstream: self.delete_upstream,
        }
        .remotes()
    }

    /// ` + origin, upstream`, or empty when no remote copy is deleted.
    pub fn remote_suffix(&self) -> String {
        let remotes = self.remotes();
        if remotes.is_empty() {
            return String::new();
        }
        let names: Vec<&str> = remotes.iter().map(|r| r.as_str()).collect();
        format!(" + {}", names.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Deciding
// ---------------------------------------------------------------------------

/// Turn a snapshot into deletion decisions. Gone, merged and remote-only
/// branches are taken as-is; each stale branch is put to `prompt` after its
/// recent commits are shown.
pub fn decide(snapshot: &Snapshot, prompt: &mut dyn Prompt) -> Vec<DeletionDecision> {
    let plan = &snapshot.plan;
    let mut decisions = Vec::with_capacity(plan.len());

    for branch in plan.gone.iter().chain(plan.merged.iter()) {
        decisions.push(DeletionDecision::new(
            &branch.name,
            branch.category,
            snapshot.presence_of(&branch.name),
        ));
    }

    for branch in &plan.remote_only {
        if let Some(remote) = branch.remote {
            decisions.push(DeletionDecision::new(
                &branch.name,
                Category::RemoteOnly,
                RemotePresence::only(remote),
            ));
        }
    }

    for review in snapshot.stale_reviews() {
        let name = &review.branch.name;
        if !review.commits.is_empty() {
            prompt.show(&format!("Recent commits on {name}:"), review.commits);
        }
        let days = review.branch.days_inactive.unwrap_or_default();
        if prompt.ask(&format!("Delete {name} (inactive for {days} days)?"), true) {
            decisions.push(DeletionDecision::new(name, Category::Stale, review.presence));
        }
    }

    decisions
}

/// Decisions grouped by category in precedence order, empty groups skipped.
pub fn summary_by_category(
    decisions: &[DeletionDecision],
) -> Vec<(Category, Vec<&DeletionDecision>)> {
    Category::all()
        .iter()
        .map(|c| (*c, decisions.iter().filter(|d| d.category == *c).collect::<Vec<_>>()))
        .filter(|(_, group)| !group.is_empty())
        .collect()
}

/// Local branch names a set of decisions will remove.
pub fn deleted_local_names(decisions: &[DeletionDecision]) -> Vec<&str> {
    decisions
        .iter()
        .filter(|d| d.category != Category::RemoteOnly)
        .map(|d| d.branch.as_str())
        .collect()
}
