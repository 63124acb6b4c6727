use crate::output::{print_json, print_table};
use crate::prompt::StdinPrompt;
use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tidy_core::{
    branch::RemainingBranch,
    classifier::CategorizedPlan,
    collect::{load_snapshot, CollectOptions, Snapshot},
    config::Config,
    delete::{self, DeletionReport, StepResult, Target},
    git::{self, Git, SystemGit},
    github::{self, GithubClient, MergeLookup},
    plan::{self, DeletionDecision},
    prompt::{AcceptDefaults, Prompt},
    sync::{self, SyncOutcome, SyncReport},
};

pub struct TidyOptions {
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub stale_days: Option<u32>,
    pub assume_yes: bool,
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, opts: TidyOptions) -> anyhow::Result<()> {
    let config_path = Config::resolve_path(opts.config.as_deref());
    let mut config = Config::load(config_path.as_deref()).context("failed to load config")?;
    if let Some(days) = opts.stale_days {
        config.stale_days = days;
    }
    for w in config.checked_warnings().context("config validation found errors")? {
        tracing::warn!("config: {}", w.message);
    }

    let git = Arc::new(SystemGit::open(root, opts.dry_run)?);

    if !opts.json {
        println!("Git Repository Housekeeping\n");
    }

    let env = |key: &str| std::env::var(key).ok();
    let lookup = github::detect(&*git, &env, config.enterprise_host.as_deref())
        .map(|target| GithubClient::new(target, config.max_pr_pages));

    let default_branch = git::default_branch(&*git);
    if !opts.json {
        println!("Default branch: {default_branch}\n");
    }

    let snapshot = load_snapshot(
        git.clone(),
        lookup.as_ref().map(|c| c as &dyn MergeLookup),
        &CollectOptions {
            default_branch: &default_branch,
            stale_days: config.stale_days,
            protected: &config.protected,
            workers: config.workers,
        },
        Utc::now(),
    )
    .context("failed to load branch information")?;

    if opts.json {
        return run_json(&*git, &snapshot, &opts);
    }

    print_review(&snapshot.plan);

    // Ctrl+C is only caught while someone can be prompted.
    let mut stdin_prompt;
    let mut accept = AcceptDefaults;
    let prompt: &mut dyn Prompt = if opts.assume_yes {
        &mut accept
    } else {
        stdin_prompt = StdinPrompt::new();
        &mut stdin_prompt
    };

    if !snapshot.plan.stale.is_empty() {
        println!(
            "Found {} stale branches (inactive for {}+ days):",
            snapshot.plan.stale.len(),
            config.stale_days
        );
        println!("Review each branch:\n");
    }
    let decisions = plan::decide(&snapshot, prompt);
    if prompt.cancelled() {
        return interrupted();
    }

    if decisions.is_empty() {
        println!("\nNo branches to delete. Housekeeping complete!");
        print_remaining(&*git, &default_branch, &config.protected, &[])?;
        return Ok(());
    }

    print_deletion_summary(&decisions);
    println!();
    print_remaining(&*git, &default_branch, &config.protected, &decisions)?;

    if opts.dry_run {
        println!("\n[DRY RUN] No changes made");
        println!("\nHousekeeping complete!");
        return Ok(());
    }

    if !prompt.ask("\nProceed with deletion?", true) {
        if prompt.cancelled() {
            return interrupted();
        }
        println!("Cancelled");
        println!("\nHousekeeping complete!");
        return Ok(());
    }

    println!("\nSyncing {default_branch} with upstream...");
    let sync_report = sync::sync_default_branch(&*git, prompt, &default_branch)
        .with_context(|| format!("failed to sync {default_branch}"))?;
    print_sync(&sync_report);
    if prompt.cancelled() {
        return interrupted();
    }

    println!("\nDeleting branches...");
    let report = delete::execute(&*git, &default_branch, &decisions);
    print_deletions(&report);

    println!("\nHousekeeping complete!");
    Ok(())
}

/// Ctrl+C at a prompt ends the run normally.
fn interrupted() -> anyhow::Result<()> {
    println!("\nInterrupted");
    Ok(())
}

/// Machine-readable run. Stale branches take the default answer; nothing is
/// deleted unless `--yes` was given.
fn run_json(git: &dyn Git, snapshot: &Snapshot, opts: &TidyOptions) -> anyhow::Result<()> {
    let decisions = plan::decide(snapshot, &mut AcceptDefaults);

    let mut sync_report: Option<SyncReport> = None;
    let mut deletions: Option<DeletionReport> = None;
    if opts.assume_yes && !opts.dry_run && !decisions.is_empty() {
        sync_report = Some(
            sync::sync_default_branch(git, &mut AcceptDefaults, &snapshot.default_branch)
                .with_context(|| format!("failed to sync {}", snapshot.default_branch))?,
        );
        deletions = Some(delete::execute(git, &snapshot.default_branch, &decisions));
    }

    print_json(&serde_json::json!({
        "default_branch": snapshot.default_branch,
        "dry_run": opts.dry_run,
        "merge_lookup": snapshot.merge_lookup,
        "plan": snapshot.plan,
        "decisions": decisions,
        "sync": sync_report,
        "deletions": deletions,
    }))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_review(plan: &CategorizedPlan) {
    if plan.is_empty() {
        return;
    }
    println!("Branches to review:\n");
    let rows = plan
        .iter()
        .map(|b| vec![b.display_name(), b.category.title().to_string(), b.details.clone()])
        .collect();
    print_table(&["Branch", "Category", "Details"], rows);
    println!();
}

fn print_deletion_summary(decisions: &[DeletionDecision]) {
    println!("\nWill delete {} branches:", decisions.len());
    for (category, group) in plan::summary_by_category(decisions) {
        println!("\n{} branches ({}):", category.title(), group.len());
        for d in group {
            println!("  • {}{}", d.branch, d.remote_suffix());
        }
    }
}

fn print_remaining(
    git: &dyn Git,
    default_branch: &str,
    protected: &[String],
    decisions: &[DeletionDecision],
) -> anyhow::Result<()> {
    let deleted = plan::deleted_local_names(decisions);
    let exclude = |name: &str| {
        name == default_branch
            || protected.iter().any(|p| p == name)
            || deleted.contains(&name)
    };
    let rows: Vec<RemainingBranch> =
        git::remaining_branches(git, &exclude).context("failed to list remaining branches")?;

    println!("\nRemaining branches:");
    let rows = rows
        .into_iter()
        .map(|r| {
            let marker = if r.is_current { "*" } else { " " };
            vec![format!("{marker} {}", r.name), r.last_commit, r.subject]
        })
        .collect();
    print_table(&["Branch", "Last Commit", "Message"], rows);
    Ok(())
}

fn print_sync(report: &SyncReport) {
    if report.stashed {
        println!("Stashed uncommitted changes (restored)");
    }
    let line = match report.outcome {
        SyncOutcome::UpToDate => format!(
            "✓ {} is up to date with {}",
            report.default_branch, report.upstream_ref
        ),
        SyncOutcome::FastForwarded => format!(
            "✓ {} fast-forwarded to {}",
            report.default_branch, report.upstream_ref
        ),
        SyncOutcome::Rebased => format!(
            "✓ {} rebased onto {}",
            report.default_branch, report.upstream_ref
        ),
        SyncOutcome::Diverged => format!(
            "! {} has diverged from {} (left as is)",
            report.default_branch, report.upstream_ref
        ),
        SyncOutcome::NoUpstream => format!(
            "! {} not found, {} left as is",
            report.upstream_ref, report.default_branch
        ),
    };
    println!("{line}");
    if let Some(branch) = &report.restored_branch {
        println!("Switched back to {branch}");
    }
}

fn print_deletions(report: &DeletionReport) {
    for outcome in &report.branches {
        for step in &outcome.steps {
            let what = match &step.target {
                Target::Checkout { branch } => format!("switched to {branch}"),
                Target::Local => format!("local branch {}", outcome.branch),
                Target::Remote { remote } => {
                    format!("remote branch {remote}/{}", outcome.branch)
                }
            };
            match &step.result {
                StepResult::Done if matches!(step.target, Target::Checkout { .. }) => {
                    println!("✓ {what} (current branch will be deleted)")
                }
                StepResult::Done => println!("✓ Deleted {what}"),
                StepResult::Failed(reason) => println!("✗ Failed: {what}: {reason}"),
                StepResult::Skipped(reason) => println!("- Skipped {what}: {reason}"),
            }
        }
    }
    let failures = report.failure_count();
    if failures > 0 {
        println!("\n{failures} step(s) failed; the rest were completed");
    }
}
