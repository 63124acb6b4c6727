//! Branch records and the parsers that build them from git output.
//!
//! Every `for-each-ref` format used here separates fields with `%09` (tab).
//! Control characters are not allowed in ref names, so a tab can never be
//! part of a branch name.

use crate::error::{Result, TidyError};
use crate::types::{Remote, Tracking};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LOCAL_BRANCH_FORMAT: &str =
    "--format=%(refname:short)%09%(upstream:short)%09%(upstream:track)%09%(committerdate:iso8601-strict)";

pub const REMAINING_BRANCH_FORMAT: &str =
    "--format=%(refname:short)%09%(committerdate:relative)%09%(subject)";

// ---------------------------------------------------------------------------
// LocalBranch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalBranch {
    pub name: String,
    pub tracking: Tracking,
    pub last_commit: DateTime<Utc>,
}

impl LocalBranch {
    pub fn days_inactive(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_commit).num_days()
    }
}

/// Parse output of `git for-each-ref` with [`LOCAL_BRANCH_FORMAT`].
pub fn parse_local_branches(output: &str) -> Result<Vec<LocalBranch>> {
    let mut branches = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(4, '\t');
        let (Some(name), Some(upstream), Some(track), Some(date)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            tracing::debug!(line, "skipping malformed for-each-ref line");
            continue;
        };
        let last_commit = DateTime::parse_from_rfc3339(date.trim())
            .map_err(|source| TidyError::Date {
                value: date.trim().to_string(),
                source,
            })?
            .with_timezone(&Utc);
        branches.push(LocalBranch {
            name: name.to_string(),
            tracking: Tracking::from_refs(upstream, track),
            last_commit,
        });
    }
    Ok(branches)
}

// ---------------------------------------------------------------------------
// RemoteBranch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteBranch {
    pub remote: Remote,
    pub name: String,
}

/// Parse output of `git branch -r`, keeping only `origin` and `upstream`.
/// Symbolic `HEAD` entries are dropped.
pub fn parse_remote_branches(output: &str) -> Vec<RemoteBranch> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(" -> "))
        .filter_map(|line| {
            let (remote, name) = line.split_once('/')?;
            if name == "HEAD" {
                return None;
            }
            Some(RemoteBranch {
                remote: Remote::from_name(remote)?,
                name: name.to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// RemainingBranch
// ---------------------------------------------------------------------------

/// A local branch that survives the run, as shown in the closing summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingBranch {
    pub name: String,
    pub last_commit: String,
    pub subject: String,
    pub is_current: bool,
}

/// Parse output of `git for-each-ref` with [`REMAINING_BRANCH_FORMAT`],
/// dropping every name in `exclude`.
pub fn parse_remaining_branches(
    output: &str,
    current: &str,
    exclude: &dyn Fn(&str) -> bool,
) -> Vec<RemainingBranch> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let name = fields.next()?.trim();
            let when = fields.next()?;
            let subject = fields.next()?;
            if name.is_empty() || exclude(name) {
                return None;
            }
            Some(RemainingBranch {
                name: name.to_string(),
                last_commit: when.to_string(),
                subject: subject.to_string(),
                is_current: name == current,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_local_branches_with_tracking() {
        let out = "main\torigin/main\t\t2024-03-01T10:00:00+00:00\n\
                   bugfix-y\torigin/bugfix-y\t[gone]\t2024-02-01T10:00:00+01:00\n\
                   scratch\t\t\t2024-01-15T08:30:00-05:00\n";
        let branches = parse_local_branches(out).unwrap();
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[0].tracking, Tracking::Ok);
        assert_eq!(branches[1].tracking, Tracking::Gone);
        assert_eq!(branches[2].tracking, Tracking::Untracked);
        assert_eq!(
            branches[1].last_commit,
            Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn bad_date_is_an_error() {
        let out = "feature\t\t\tyesterday\n";
        assert!(matches!(
            parse_local_branches(out),
            Err(TidyError::Date { .. })
        ));
    }

    #[test]
    fn days_inactive_counts_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 21, 12, 0, 0).unwrap();
        let b = LocalBranch {
            name: "feature-x".into(),
            tracking: Tracking::Untracked,
            last_commit: Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap(),
        };
        assert_eq!(b.days_inactive(now), 19);
    }

    #[test]
    fn parses_remote_branches_and_skips_head() {
        let out = "  origin/HEAD -> origin/main\n\
                   \x20 origin/main\n\
                   \x20 origin/feature/login\n\
                   \x20 upstream/release\n\
                   \x20 fork/other\n\
                   \x20 origin\n";
        let remotes = parse_remote_branches(out);
        assert_eq!(
            remotes,
            vec![
                RemoteBranch {
                    remote: Remote::Origin,
                    name: "main".into()
                },
                RemoteBranch {
                    remote: Remote::Origin,
                    name: "feature/login".into()
                },
                RemoteBranch {
                    remote: Remote::Upstream,
                    name: "release".into()
                },
            ]
        );
    }

    #[test]
    fn remaining_marks_current_and_excludes() {
        let out = "main\t2 hours ago\tInitial commit\n\
                   wip\t3 days ago\tWork\tin progress\n\
                   old\t5 weeks ago\tOld stuff\n";
        let rows = parse_remaining_branches(out, "wip", &|name| name == "main");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "wip");
        assert!(rows[0].is_current);
        assert_eq!(rows[0].subject, "Work\tin progress");
        assert!(!rows[1].is_current);
    }
}
