use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Why a branch is up for deletion. Declaration order is precedence order:
/// a branch matching several predicates takes the earliest category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Gone,
    Merged,
    RemoteOnly,
    Stale,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Gone,
            Category::Merged,
            Category::RemoteOnly,
            Category::Stale,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Gone => "gone",
            Category::Merged => "merged",
            Category::RemoteOnly => "remote-only",
            Category::Stale => "stale",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Gone => "Gone",
            Category::Merged => "Merged",
            Category::RemoteOnly => "Remote-only",
            Category::Stale => "Stale",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gone" => Ok(Category::Gone),
            "merged" => Ok(Category::Merged),
            "remote-only" => Ok(Category::RemoteOnly),
            "stale" => Ok(Category::Stale),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tracking {
    /// Upstream is configured but the remote ref no longer exists.
    Gone,
    Ok,
    Untracked,
}

impl Tracking {
    /// Derive tracking state from `%(upstream:short)` and `%(upstream:track)`.
    pub fn from_refs(upstream: &str, track: &str) -> Tracking {
        if upstream.trim().is_empty() {
            Tracking::Untracked
        } else if track.contains("gone") {
            Tracking::Gone
        } else {
            Tracking::Ok
        }
    }
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remote {
    Origin,
    Upstream,
}

impl Remote {
    pub fn all() -> &'static [Remote] {
        &[Remote::Origin, Remote::Upstream]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Remote::Origin => "origin",
            Remote::Upstream => "upstream",
        }
    }

    pub fn from_name(name: &str) -> Option<Remote> {
        match name {
            "origin" => Some(Remote::Origin),
            "upstream" => Some(Remote::Upstream),
            _ => None,
        }
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RemotePresence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePresence {
    pub origin: bool,
    pub upstream: bool,
}

impl RemotePresence {
    pub fn only(remote: Remote) -> Self {
        match remote {
            Remote::Origin => Self {
                origin: true,
                upstream: false,
            },
            Remote::Upstream => Self {
                origin: false,
                upstream: true,
            },
        }
    }

    pub fn has(&self, remote: Remote) -> bool {
        match remote {
            Remote::Origin => self.origin,
            Remote::Upstream => self.upstream,
        }
    }

    pub fn remotes(&self) -> Vec<Remote> {
        Remote::all()
            .iter()
            .copied()
            .filter(|r| self.has(*r))
            .collect()
    }
}
