use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "GIT_TIDY_CONFIG";
pub const CONFIG_FILE: &str = ".config/git-tidy.yaml";
const MAX_SENSIBLE_WORKERS: usize = 64;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Days without a commit before a branch counts as stale.
    #[serde(default = "default_stale_days")]
    pub stale_days: u32,
    /// Upper bound on concurrent remote-presence checks.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Branches that are never classified and never listed as remaining.
    #[serde(default)]
    pub protected: Vec<String>,
    /// Pages of closed pull requests (100 each) to scan for merged heads.
    #[serde(default = "default_max_pr_pages")]
    pub max_pr_pages: u32,
    /// GitHub Enterprise hostname. Falls back to `GITHUB_ENTERPRISE_HOST`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise_host: Option<String>,
}

fn default_stale_days() -> u32 {
    14
}

fn default_workers() -> usize {
    12
}

fn default_max_pr_pages() -> u32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stale_days: default_stale_days(),
            workers: default_workers(),
            protected: Vec::new(),
            max_pr_pages: default_max_pr_pages(),
            enterprise_host: None,
        }
    }
}

impl Config {
    /// Where the config file lives: `explicit`, else `$GIT_TIDY_CONFIG`, else
    /// `~/.config/git-tidy.yaml`. `None` only when no home directory is known.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = explicit {
            return Some(p.to_path_buf());
        }
        if let Some(p) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(p));
        }
        home::home_dir().map(|h| h.join(CONFIG_FILE))
    }

    /// Load from `path`. A missing file yields the defaults. Values are not
    /// checked here; see [`Config::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.stale_days == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "stale_days is 0: every branch without a commit today is stale"
                    .to_string(),
            });
        }

        if self.workers == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "workers must be at least 1".to_string(),
            });
        } else if self.workers > MAX_SENSIBLE_WORKERS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "workers is {}: remotes may throttle more than {MAX_SENSIBLE_WORKERS} concurrent ls-remote calls",
                    self.workers
                ),
            });
        }

        if self.max_pr_pages == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_pr_pages is 0: merged pull requests will never be found"
                    .to_string(),
            });
        }

        for name in &self.protected {
            if name.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "protected contains an empty branch name".to_string(),
                });
            }
        }

        warnings
    }

    /// [`Config::validate`] for callers about to use the config: any
    /// error-level finding becomes [`TidyError::InvalidConfig`], the rest are
    /// returned.
    pub fn checked_warnings(&self) -> Result<Vec<ConfigWarning>> {
        let (errors, warnings): (Vec<_>, Vec<_>) = self
            .validate()
            .into_iter()
            .partition(|w| w.level == WarnLevel::Error);
        if errors.is_empty() {
            return Ok(warnings);
        }
        let messages: Vec<String> = errors.into_iter().map(|w| w.message).collect();
        Err(TidyError::InvalidConfig(messages.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(Some(&dir.path().join("nope.yaml"))).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.stale_days, 14);
        assert_eq!(cfg.workers, 12);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tidy.yaml");
        std::fs::write(&path, "stale_days: 30\nprotected:\n  - dependency-updates\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.stale_days, 30);
        assert_eq!(cfg.workers, 12);
        assert_eq!(cfg.protected, vec!["dependency-updates".to_string()]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tidy.yaml");
        std::fs::write(&path, "stale_days: [not a number\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(TidyError::Yaml(_))));
    }

    #[test]
    fn zero_workers_loads_but_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tidy.yaml");
        std::fs::write(&path, "workers: 0\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.workers, 0);
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
        assert_eq!(warnings[0].message, "workers must be at least 1");
    }

    #[test]
    fn explicit_path_wins() {
        let p = PathBuf::from("/tmp/custom.yaml");
        assert_eq!(Config::resolve_path(Some(&p)), Some(p));
    }

    #[test]
    fn validate_flags_suspicious_values() {
        let cfg = Config {
            stale_days: 0,
            workers: 100,
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.level == WarnLevel::Warning));

        let cfg = Config {
            workers: 0,
            ..Config::default()
        };
        assert!(cfg.validate().iter().any(|w| w.level == WarnLevel::Error));
    }

    #[test]
    fn checked_warnings_rejects_errors_only() {
        let cfg = Config {
            stale_days: 0,
            ..Config::default()
        };
        assert_eq!(cfg.checked_warnings().unwrap().len(), 1);

        let cfg = Config {
            workers: 0,
            ..Config::default()
        };
        let err = cfg.checked_warnings().unwrap_err();
        assert!(matches!(err, TidyError::InvalidConfig(ref m) if m == "workers must be at least 1"));
    }

    #[test]
    fn default_config_is_clean() {
        assert!(Config::default().validate().is_empty());
    }
}
