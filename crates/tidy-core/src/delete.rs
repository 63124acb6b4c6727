//! Sequential execution of deletion decisions.
//!
//! Every step reports its own outcome. A failing step never stops the
//! remaining remotes or the remaining branches.

use crate::git::{self, Git};
use crate::plan::DeletionDecision;
use crate::types::{Category, Remote};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Target {
    Checkout { branch: String },
    Local,
    Remote { remote: Remote },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepResult {
    Done,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    #[serde(flatten)]
    pub target: Target,
    pub result: StepResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOutcome {
    pub branch: String,
    pub category: Category,
    pub steps: Vec<Step>,
}

impl BranchOutcome {
    pub fn failures(&self) -> impl Iterator<Item = &Step> {
        self.steps
            .iter()
            .filter(|s| matches!(s.result, StepResult::Failed(_)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub branches: Vec<BranchOutcome>,
}

impl DeletionReport {
    pub fn failure_count(&self) -> usize {
        self.branches.iter().map(|b| b.failures().count()).sum()
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

pub fn execute(
    git: &dyn Git,
    default_branch: &str,
    decisions: &[DeletionDecision],
) -> DeletionReport {
    let mut report = DeletionReport::default();
    for (idx, decision) in decisions.iter().enumerate() {
        tracing::info!(
            branch = %decision.branch,
            category = %decision.category,
            "deleting ({}/{})",
            idx + 1,
            decisions.len()
        );
        let mut steps = Vec::new();
        if decision.category != Category::RemoteOnly {
            delete_local(git, default_branch, &decision.branch, &mut steps);
        }
        for remote in decision.remotes() {
            steps.push(delete_remote(git, remote, &decision.branch));
        }
        report.branches.push(BranchOutcome {
            branch: decision.branch.clone(),
            category: decision.category,
            steps,
        });
    }
    report
}

fn delete_local(git: &dyn Git, default_branch: &str, branch: &str, steps: &mut Vec<Step>) {
    if !git::local_branch_exists(git, branch) {
        steps.push(Step {
            target: Target::Local,
            result: StepResult::Skipped("no local branch".to_string()),
        });
        return;
    }

    if git::current_branch(git).is_ok_and(|current| current == branch) {
        tracing::warn!(branch, "switching to {default_branch} (current branch will be deleted)");
        let result = match git.run(&["checkout", default_branch]) {
            Ok(_) => StepResult::Done,
            Err(e) => StepResult::Failed(e.to_string()),
        };
        let switched = result == StepResult::Done;
        steps.push(Step {
            target: Target::Checkout {
                branch: default_branch.to_string(),
            },
            result,
        });
        if !switched {
            steps.push(Step {
                target: Target::Local,
                result: StepResult::Skipped("still checked out".to_string()),
            });
            return;
        }
    }

    let result = match git.run(&["branch", "-D", branch]) {
        Ok(_) => StepResult::Done,
        Err(e) => {
            tracing::warn!(branch, error = %e, "local delete failed");
            StepResult::Failed(e.to_string())
        }
    };
    steps.push(Step {
        target: Target::Local,
        result,
    });
}

fn delete_remote(git: &dyn Git, remote: Remote, branch: &str) -> Step {
    let result = match git.run(&["push", remote.as_str(), "--delete", branch]) {
        Ok(_) => StepResult::Done,
        Err(e) => {
            tracing::warn!(branch, remote = %remote, error = %e, "remote delete failed");
            StepResult::Failed(e.to_string())
        }
    };
    Step {
        target: Target::Remote { remote },
        result,
    }
}
