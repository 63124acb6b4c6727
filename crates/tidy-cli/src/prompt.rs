use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tidy_core::prompt::Prompt;

/// What a waiting prompt can receive.
enum Input {
    Line(String),
    Closed,
    Interrupted,
}

/// Line-based yes/no prompts on stdin. An empty answer takes the default.
/// End of input or Ctrl+C answers "no" to this and every later question.
///
/// Stdin is read on a helper thread and Ctrl+C is caught on another, both
/// feeding one channel, so an interrupt ends a prompt that is blocked
/// waiting for a line.
pub struct StdinPrompt<W: Write = io::Stdout> {
    input: Receiver<Input>,
    out: W,
    closed: bool,
    interrupted: Arc<AtomicBool>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let interrupted = Arc::new(AtomicBool::new(false));
        read_stdin(tx.clone());
        watch_ctrl_c(tx, Arc::clone(&interrupted));
        Self::with_io(rx, interrupted, io::stdout())
    }
}

impl<W: Write> StdinPrompt<W> {
    fn with_io(input: Receiver<Input>, interrupted: Arc<AtomicBool>, out: W) -> Self {
        Self {
            input,
            out,
            closed: false,
            interrupted,
        }
    }

    /// Finish the prompt line and answer "no".
    fn decline(&mut self) -> bool {
        if writeln!(self.out).is_err() {
            self.closed = true;
        }
        false
    }
}

impl<W: Write> Prompt for StdinPrompt<W> {
    fn show(&mut self, heading: &str, lines: &[String]) {
        let mut text = format!("{heading}\n");
        for line in lines {
            text.push_str(&format!("  {line}\n"));
        }
        text.push('\n');
        if self.out.write_all(text.as_bytes()).is_err() {
            self.closed = true;
        }
    }

    fn ask(&mut self, question: &str, default: bool) -> bool {
        if self.closed || self.cancelled() {
            return false;
        }
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            // The question must be visible before blocking on input.
            let shown = write!(self.out, "{question} {hint} ").and_then(|_| self.out.flush());
            if shown.is_err() {
                self.closed = true;
                return false;
            }

            let line = match self.input.recv() {
                Ok(Input::Line(line)) => line,
                Ok(Input::Interrupted) => {
                    self.interrupted.store(true, Ordering::SeqCst);
                    return self.decline();
                }
                Ok(Input::Closed) | Err(_) => {
                    self.closed = true;
                    return self.decline();
                }
            };
            match parse_answer(&line, default) {
                Some(answer) => return answer,
                None => {
                    if writeln!(self.out, "Please answer y or n.").is_err() {
                        self.closed = true;
                        return false;
                    }
                }
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

fn parse_answer(line: &str, default: bool) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn read_stdin(tx: Sender<Input>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        tx.send(Input::Closed).ok();
    });
}

/// Catch Ctrl+C for the rest of the process. Without a runtime the default
/// handler stays in place.
fn watch_ctrl_c(tx: Sender<Input>, interrupted: Arc<AtomicBool>) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!(error = %e, "could not install Ctrl+C handler");
            return;
        }
    };
    std::thread::spawn(move || {
        rt.block_on(async {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupted");
                interrupted.store(true, Ordering::SeqCst);
                if tx.send(Input::Interrupted).is_err() {
                    break;
                }
            }
        });
    });
}
