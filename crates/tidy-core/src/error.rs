use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TidyError {
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error("git {args} failed: {stderr}")]
    GitFailed { args: String, stderr: String },

    #[error("GitHub API error: {0}")]
    Github(String),

    #[error("invalid remote url: {0}")]
    InvalidRemoteUrl(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid commit date '{value}': {source}")]
    Date {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TidyError>;
