/// Interactive confirmation seam. The CLI implements it over stdin; the
/// planner and sync logic only ever talk to this trait.
pub trait Prompt {
    /// Show context lines (e.g. recent commits) ahead of a question.
    fn show(&mut self, _heading: &str, _lines: &[String]) {}

    /// Ask a yes/no question. Implementations return `default` when the user
    /// just presses enter.
    fn ask(&mut self, question: &str, default: bool) -> bool;

    /// True once the user abandoned the run (Ctrl+C at a prompt). Every
    /// question asked afterwards is answered "no".
    fn cancelled(&self) -> bool {
        false
    }
}

/// Answers every question with its default. Used for `--yes` and JSON output.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptDefaults;

impl Prompt for AcceptDefaults {
    fn ask(&mut self, question: &str, default: bool) -> bool {
        tracing::debug!(question, default, "auto-answering prompt");
        default
    }
}
