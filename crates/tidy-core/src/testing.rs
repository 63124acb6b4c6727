//! Test doubles shared by the unit tests in this crate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::{Result, TidyError};
use crate::git::{is_mutating, Git};
use crate::github::MergeLookup;
use crate::prompt::Prompt;

/// A [`Git`] that answers from a table keyed by the joined argument list and
/// records every command it executes. Unknown commands succeed with empty
/// output.
#[derive(Default)]
pub struct FakeGit {
    responses: HashMap<String, std::result::Result<String, String>>,
    calls: Mutex<Vec<String>>,
    dry_run: bool,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, args: &[&str], stdout: &str) -> Self {
        self.responses.insert(args.join(" "), Ok(stdout.to_string()));
        self
    }

    pub fn fail(mut self, args: &[&str], stderr: &str) -> Self {
        self.responses
            .insert(args.join(" "), Err(stderr.to_string()));
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Commands that actually ran, in order. Suppressed dry-run commands are
    /// not included.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn position(&self, command: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == command)
    }

    pub fn ran(&self, command: &str) -> bool {
        self.position(command).is_some()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| is_mutating(&c.split(' ').collect::<Vec<_>>()))
            .collect()
    }
}

impl Git for FakeGit {
    fn run(&self, args: &[&str]) -> Result<String> {
        if self.dry_run && is_mutating(args) {
            return Ok(String::new());
        }
        let key = args.join(" ");
        self.calls.lock().unwrap().push(key.clone());
        match self.responses.get(&key) {
            Some(Ok(out)) => Ok(out.clone()),
            Some(Err(stderr)) => Err(TidyError::GitFailed {
                args: key,
                stderr: stderr.clone(),
            }),
            None => Ok(String::new()),
        }
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// A [`Prompt`] that replays queued answers, falling back to each question's
/// default once the queue is empty.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    pub asked: Vec<String>,
    pub shown: Vec<String>,
    cancelled: bool,
}

impl ScriptedPrompt {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Behaves like a prompt the user hit Ctrl+C at: every answer is "no".
    pub fn interrupted() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn show(&mut self, heading: &str, _lines: &[String]) {
        self.shown.push(heading.to_string());
    }

    fn ask(&mut self, question: &str, default: bool) -> bool {
        self.asked.push(question.to_string());
        if self.cancelled {
            return false;
        }
        self.answers.pop_front().unwrap_or(default)
    }

    fn cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A [`MergeLookup`] with a fixed answer.
pub struct StaticLookup(std::result::Result<HashSet<String>, String>);

impl StaticLookup {
    pub fn merged(heads: &[&str]) -> Self {
        Self(Ok(heads.iter().map(|h| h.to_string()).collect()))
    }

    pub fn failing(message: &str) -> Self {
        Self(Err(message.to_string()))
    }
}

impl MergeLookup for StaticLookup {
    fn merged_heads(&self) -> Result<HashSet<String>> {
        self.0.clone().map_err(TidyError::Github)
    }
}
