use crate::classifier::{EvalContext, Rule};
use crate::types::{Category, Tracking};

// ---------------------------------------------------------------------------
// Condition helpers
// ---------------------------------------------------------------------------

fn is_gone(ctx: &EvalContext) -> bool {
    ctx.branch.tracking == Tracking::Gone
}

fn has_merged_pr(ctx: &EvalContext) -> bool {
    ctx.merged
        .map(|set| set.contains(&ctx.branch.name))
        .unwrap_or(false)
}

fn is_stale(ctx: &EvalContext) -> bool {
    ctx.branch.last_commit < ctx.cutoff
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Local-branch rules in precedence order. Remote-only branches have no local
/// ref to evaluate and are handled by the classifier directly.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "tracking_gone",
            category: Category::Gone,
            condition: is_gone,
            details: |_| "Tracking deleted remote".to_string(),
        },
        Rule {
            id: "pr_merged",
            category: Category::Merged,
            condition: has_merged_pr,
            details: |_| "PR has been merged".to_string(),
        },
        Rule {
            id: "inactive",
            category: Category::Stale,
            condition: is_stale,
            details: |ctx| format!("Inactive for {} days", ctx.branch.days_inactive(ctx.now)),
        },
    ]
}
