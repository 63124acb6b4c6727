pub mod branch;
pub mod classifier;
pub mod collect;
pub mod config;
pub mod delete;
pub mod error;
pub mod git;
pub mod github;
pub mod plan;
pub mod prompt;
pub mod rules;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TidyError};
