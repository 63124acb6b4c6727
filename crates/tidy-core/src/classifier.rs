use crate::branch::{LocalBranch, RemoteBranch};
use crate::rules::default_rules;
use crate::types::{Category, Remote};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// EvalContext
// ---------------------------------------------------------------------------

pub struct EvalContext<'a> {
    pub branch: &'a LocalBranch,
    /// Head refs of merged pull requests. `None` when no lookup is available.
    pub merged: Option<&'a HashSet<String>>,
    pub now: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ClassifiedBranch / CategorizedPlan (output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedBranch {
    pub name: String,
    pub category: Category,
    /// Set for remote-only entries: the remote the branch lives on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<Remote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_inactive: Option<i64>,
    pub details: String,
}

impl ClassifiedBranch {
    pub fn display_name(&self) -> String {
        match self.remote {
            Some(remote) => format!("{remote}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedPlan {
    pub gone: Vec<ClassifiedBranch>,
    pub merged: Vec<ClassifiedBranch>,
    pub remote_only: Vec<ClassifiedBranch>,
    pub stale: Vec<ClassifiedBranch>,
}

impl CategorizedPlan {
    pub fn bucket(&self, category: Category) -> &[ClassifiedBranch] {
        match category {
            Category::Gone => &self.gone,
            Category::Merged => &self.merged,
            Category::RemoteOnly => &self.remote_only,
            Category::Stale => &self.stale,
        }
    }

    fn bucket_mut(&mut self, category: Category) -> &mut Vec<ClassifiedBranch> {
        match category {
            Category::Gone => &mut self.gone,
            Category::Merged => &mut self.merged,
            Category::RemoteOnly => &mut self.remote_only,
            Category::Stale => &mut self.stale,
        }
    }

    pub fn push(&mut self, entry: ClassifiedBranch) {
        self.bucket_mut(entry.category).push(entry);
    }

    /// All entries in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedBranch> {
        Category::all().iter().flat_map(|c| self.bucket(*c).iter())
    }

    pub fn len(&self) -> usize {
        self.gone.len() + self.merged.len() + self.remote_only.len() + self.stale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of local branches that were classified (remote-only excluded).
    pub fn local_names(&self) -> Vec<&str> {
        self.iter()
            .filter(|b| b.remote.is_none())
            .map(|b| b.name.as_str())
            .collect()
    }

    fn sort(&mut self) {
        self.gone.sort_by(|a, b| a.name.cmp(&b.name));
        self.merged.sort_by(|a, b| a.name.cmp(&b.name));
        self.remote_only
            .sort_by(|a, b| (a.remote, &a.name).cmp(&(b.remote, &b.name)));
        self.stale.sort_by(|a, b| {
            a.days_inactive
                .cmp(&b.days_inactive)
                .then_with(|| a.name.cmp(&b.name))
        });
    }
}

// ---------------------------------------------------------------------------
// ClassifyInput
// ---------------------------------------------------------------------------

pub struct ClassifyInput<'a> {
    pub local: &'a [LocalBranch],
    pub remote: &'a [RemoteBranch],
    pub default_branch: &'a str,
    pub merged: Option<&'a HashSet<String>>,
    pub stale_days: u32,
    /// Names never classified, in addition to the default branch.
    pub protected: &'a [String],
}

impl ClassifyInput<'_> {
    fn is_excluded(&self, name: &str) -> bool {
        name == self.default_branch || self.protected.iter().any(|p| p == name)
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A fn-pointer rule evaluated against one local branch.
pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub condition: fn(&EvalContext) -> bool,
    pub details: fn(&EvalContext) -> String,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Classifier {
    /// Rules are evaluated in order and the first match wins, so callers must
    /// list them in category precedence order.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, input: &ClassifyInput, now: DateTime<Utc>) -> CategorizedPlan {
        let cutoff = now - Duration::days(i64::from(input.stale_days));
        let mut plan = CategorizedPlan::default();

        for branch in input.local {
            if input.is_excluded(&branch.name) {
                continue;
            }
            let ctx = EvalContext {
                branch,
                merged: input.merged,
                now,
                cutoff,
            };
            if let Some(rule) = self.rules.iter().find(|r| (r.condition)(&ctx)) {
                tracing::debug!(branch = %branch.name, rule = rule.id, "classified");
                plan.push(ClassifiedBranch {
                    name: branch.name.clone(),
                    category: rule.category,
                    remote: None,
                    days_inactive: (rule.category == Category::Stale)
                        .then(|| branch.days_inactive(now)),
                    details: (rule.details)(&ctx),
                });
            }
        }

        for entry in remote_only(input) {
            plan.push(entry);
        }

        plan.sort();
        plan
    }
}

/// Branches on `origin`/`upstream` with no local counterpart, kept only when
/// a merged pull request confirms them.
fn remote_only(input: &ClassifyInput) -> Vec<ClassifiedBranch> {
    let Some(merged) = input.merged else {
        return Vec::new();
    };
    let local: HashSet<&str> = input.local.iter().map(|b| b.name.as_str()).collect();
    let mut seen = HashSet::new();

    input
        .remote
        .iter()
        .filter(|rb| !input.is_excluded(&rb.name))
        .filter(|rb| !local.contains(rb.name.as_str()))
        .filter(|rb| merged.contains(&rb.name))
        .filter(|rb| seen.insert((rb.remote, rb.name.clone())))
        .map(|rb| ClassifiedBranch {
            name: rb.name.clone(),
            category: Category::RemoteOnly,
            remote: Some(rb.remote),
            days_inactive: None,
            details: format!("Merged on {}, not local", rb.remote),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tracking;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn local(name: &str, tracking: Tracking, days_ago: i64) -> LocalBranch {
        LocalBranch {
            name: name.to_string(),
            tracking,
            last_commit: now() - Duration::days(days_ago),
        }
    }

    fn remote(remote: Remote, name: &str) -> RemoteBranch {
        RemoteBranch {
            remote,
            name: name.to_string(),
        }
    }

    fn classify(
        local: &[LocalBranch],
        remote: &[RemoteBranch],
        merged: Option<&HashSet<String>>,
    ) -> CategorizedPlan {
        let input = ClassifyInput {
            local,
            remote,
            default_branch: "main",
            merged,
            stale_days: 14,
            protected: &[],
        };
        Classifier::default().classify(&input, now())
    }

    fn names(bucket: &[ClassifiedBranch]) -> Vec<&str> {
        bucket.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn old_branch_without_lookup_is_stale() {
        let plan = classify(&[local("feature-x", Tracking::Ok, 20)], &[], None);
        assert_eq!(plan.stale.len(), 1);
        assert_eq!(plan.stale[0].name, "feature-x");
        assert_eq!(plan.stale[0].details, "Inactive for 20 days");
        assert_eq!(plan.stale[0].days_inactive, Some(20));
        assert!(plan.merged.is_empty());
        assert!(plan.remote_only.is_empty());
    }

    #[test]
    fn gone_wins_over_stale() {
        let plan = classify(&[local("bugfix-y", Tracking::Gone, 30)], &[], None);
        assert_eq!(names(&plan.gone), vec!["bugfix-y"]);
        assert_eq!(plan.gone[0].details, "Tracking deleted remote");
        assert!(plan.stale.is_empty());
    }

    #[test]
    fn gone_regardless_of_recency() {
        let plan = classify(&[local("fresh", Tracking::Gone, 0)], &[], None);
        assert_eq!(names(&plan.gone), vec!["fresh"]);
    }

    #[test]
    fn merged_wins_over_stale_but_not_gone() {
        let merged: HashSet<String> = ["done", "both"].iter().map(|s| s.to_string()).collect();
        let plan = classify(
            &[
                local("done", Tracking::Ok, 40),
                local("both", Tracking::Gone, 40),
            ],
            &[],
            Some(&merged),
        );
        assert_eq!(names(&plan.gone), vec!["both"]);
        assert_eq!(names(&plan.merged), vec!["done"]);
        assert_eq!(plan.merged[0].details, "PR has been merged");
        assert!(plan.stale.is_empty());
    }

    #[test]
    fn recent_unmerged_branch_is_kept() {
        let plan = classify(&[local("active", Tracking::Ok, 3)], &[], None);
        assert!(plan.is_empty());
    }

    #[test]
    fn default_branch_never_classified() {
        let merged: HashSet<String> = ["main".to_string()].into_iter().collect();
        let plan = classify(
            &[local("main", Tracking::Gone, 400)],
            &[remote(Remote::Upstream, "main")],
            Some(&merged),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn protected_branches_are_skipped() {
        let protected = vec!["dependency-updates".to_string()];
        let input = ClassifyInput {
            local: &[local("dependency-updates", Tracking::Ok, 90)],
            remote: &[],
            default_branch: "main",
            merged: None,
            stale_days: 14,
            protected: &protected,
        };
        assert!(Classifier::default().classify(&input, now()).is_empty());
    }

    #[test]
    fn remote_only_requires_merge_confirmation() {
        let merged: HashSet<String> = ["shipped".to_string()].into_iter().collect();
        let remotes = [
            remote(Remote::Origin, "shipped"),
            remote(Remote::Upstream, "shipped"),
            remote(Remote::Origin, "unmerged"),
            remote(Remote::Origin, "local-too"),
        ];
        let plan = classify(
            &[local("local-too", Tracking::Ok, 1)],
            &remotes,
            Some(&merged),
        );
        assert_eq!(plan.remote_only.len(), 2);
        assert_eq!(plan.remote_only[0].display_name(), "origin/shipped");
        assert_eq!(plan.remote_only[1].display_name(), "upstream/shipped");
        assert_eq!(plan.remote_only[1].details, "Merged on upstream, not local");
    }

    #[test]
    fn remote_only_empty_without_lookup() {
        let plan = classify(&[], &[remote(Remote::Origin, "shipped")], None);
        assert!(plan.remote_only.is_empty());
    }

    #[test]
    fn stale_sorted_by_days_inactive() {
        let plan = classify(
            &[
                local("older", Tracking::Ok, 60),
                local("old", Tracking::Untracked, 15),
                local("middle", Tracking::Ok, 30),
            ],
            &[],
            None,
        );
        assert_eq!(names(&plan.stale), vec!["old", "middle", "older"]);
    }

    #[test]
    fn every_branch_in_at_most_one_category() {
        let merged: HashSet<String> = ["a", "b", "c", "r"].iter().map(|s| s.to_string()).collect();
        let plan = classify(
            &[
                local("a", Tracking::Gone, 50),
                local("b", Tracking::Ok, 50),
                local("c", Tracking::Gone, 1),
                local("d", Tracking::Ok, 50),
                local("e", Tracking::Untracked, 2),
            ],
            &[remote(Remote::Origin, "r"), remote(Remote::Origin, "b")],
            Some(&merged),
        );
        let mut seen = HashSet::new();
        for entry in plan.iter() {
            assert!(seen.insert(entry.display_name()), "{} listed twice", entry.name);
        }
        assert_eq!(names(&plan.gone), vec!["a", "c"]);
        assert_eq!(names(&plan.merged), vec!["b"]);
        assert_eq!(names(&plan.remote_only), vec!["r"]);
        assert_eq!(names(&plan.stale), vec!["d"]);
    }

    #[test]
    fn iter_follows_precedence() {
        let merged: HashSet<String> = ["m".to_string(), "r".to_string()].into_iter().collect();
        let plan = classify(
            &[
                local("s", Tracking::Ok, 20),
                local("m", Tracking::Ok, 1),
                local("g", Tracking::Gone, 1),
            ],
            &[remote(Remote::Origin, "r")],
            Some(&merged),
        );
        let cats: Vec<Category> = plan.iter().map(|b| b.category).collect();
        assert_eq!(
            cats,
            vec![
                Category::Gone,
                Category::Merged,
                Category::RemoteOnly,
                Category::Stale
            ]
        );
        assert_eq!(plan.local_names(), vec!["g", "m", "s"]);
    }
}
