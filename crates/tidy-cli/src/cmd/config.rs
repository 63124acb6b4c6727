use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use tidy_core::config::{Config, WarnLevel};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration and where it was loaded from
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    let path = Config::resolve_path(config);
    let loaded = Config::load(path.as_deref()).context("failed to load config")?;
    match subcmd {
        ConfigSubcommand::Show => show(path.as_deref(), &loaded, json),
        ConfigSubcommand::Validate => validate(&loaded, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(path: Option<&Path>, config: &Config, json: bool) -> anyhow::Result<()> {
    let source = match path {
        Some(p) if p.exists() => p.display().to_string(),
        _ => "(defaults)".to_string(),
    };

    if json {
        return print_json(&serde_json::json!({
            "source": source,
            "config": config,
        }));
    }

    println!("Config: {source}\n");
    let protected = if config.protected.is_empty() {
        "-".to_string()
    } else {
        config.protected.join(", ")
    };
    let rows = vec![
        vec!["stale_days".to_string(), config.stale_days.to_string()],
        vec!["workers".to_string(), config.workers.to_string()],
        vec!["protected".to_string(), protected],
        vec!["max_pr_pages".to_string(), config.max_pr_pages.to_string()],
        vec![
            "enterprise_host".to_string(),
            config.enterprise_host.clone().unwrap_or_else(|| "-".to_string()),
        ],
    ];
    print_table(&["Key", "Value"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config: &Config, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
