pub mod config;
pub mod tidy;
