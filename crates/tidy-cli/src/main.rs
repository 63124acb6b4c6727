mod cmd;
mod output;
mod prompt;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "git-tidy",
    about = "Clean up a Git repository: delete gone, merged and stale branches, sync the default branch with upstream",
    version
)]
struct Cli {
    /// Repository root (default: walk up from the current directory to .git)
    #[arg(long, global = true, env = "GIT_TIDY_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: $GIT_TIDY_CONFIG or ~/.config/git-tidy.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Days of inactivity before a branch is considered stale (default: 14)
    #[arg(long, value_name = "DAYS")]
    stale_days: Option<u32>,

    /// Answer every prompt with its default
    #[arg(long, short = 'y')]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Some(Commands::Config { subcommand }) => {
            cmd::config::run(cli.config.as_deref(), subcommand, cli.json)
        }
        None => cmd::tidy::run(
            &root,
            cmd::tidy::TidyOptions {
                config: cli.config,
                dry_run: cli.dry_run,
                stale_days: cli.stale_days,
                assume_yes: cli.yes,
                json: cli.json,
            },
        ),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
