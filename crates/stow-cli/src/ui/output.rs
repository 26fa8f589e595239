//! Terminal reporter.
//!
//! Status goes to stderr so stdout only carries command results (digests,
//! paths) and stays pipeable. The live progress line is redrawn in place
//! when stderr is a terminal and omitted otherwise.

use std::io::{IsTerminal, Stderr, Write, stderr};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use stow_core::Reporter;
use stow_schema::{Locator, ModuleId};

use super::progress::ProgressIndicator;

const REDRAW_INTERVAL: Duration = Duration::from_millis(80);

#[derive(Debug)]
struct LineState {
    progress: ProgressIndicator,
    last_draw: Option<Instant>,
    live: bool,
}

/// Reporter writing human-readable status to stderr.
#[derive(Debug)]
pub struct Output {
    quiet: bool,
    interactive: bool,
    line: Mutex<LineState>,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            interactive: stderr().is_terminal(),
            line: Mutex::new(LineState {
                progress: ProgressIndicator::new(),
                last_draw: None,
                live: false,
            }),
        }
    }

    pub fn info(&self, msg: &str) {
        self.status(&format!("{} {msg}", "·".dark_grey()));
    }

    pub fn success(&self, msg: &str) {
        self.status(&format!("{} {msg}", "✓".green()));
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, msg: &str) {
        self.print_line(&format!("{} {msg}", "error:".red().bold()));
    }

    fn status(&self, text: &str) {
        if !self.quiet {
            self.print_line(text);
        }
    }

    fn print_line(&self, text: &str) {
        let mut state = self.lock();
        let mut err = stderr();
        if state.live {
            let _ = clear_line(&mut err);
            state.live = false;
        }
        let _ = writeln!(err, "{text}");
    }

    fn draw_progress(&self, label: &str, current: u64, total: Option<u64>) {
        if self.quiet || !self.interactive {
            return;
        }
        let mut state = self.lock();
        let finished = total.is_some_and(|t| current >= t);
        let due = state
            .last_draw
            .is_none_or(|t| t.elapsed() >= REDRAW_INTERVAL);
        if !due && !finished {
            return;
        }

        let rendered = state.progress.render(current, total);
        if redraw(&mut stderr(), &format!("{} {label}", rendered.cyan())).is_ok() {
            state.last_draw = Some(Instant::now());
            state.live = true;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LineState> {
        self.line
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn clear_line(err: &mut Stderr) -> std::io::Result<()> {
    err.queue(MoveToColumn(0))?;
    err.queue(Clear(ClearType::CurrentLine))?;
    Ok(())
}

fn redraw(err: &mut Stderr, text: &str) -> std::io::Result<()> {
    clear_line(err)?;
    write!(err, "{text}")?;
    err.flush()
}

impl Reporter for Output {
    fn downloading(&self, locator: &Locator, current: u64, total: Option<u64>) {
        self.draw_progress(&locator.to_string(), current, total);
    }

    fn verifying(&self, locator: &Locator) {
        tracing::debug!(%locator, "verifying");
    }

    fn cached(&self, locator: &Locator, path: &Path) {
        self.success(&format!("{locator} {}", format!("(cached at {})", path.display()).dark_grey()));
    }

    fn done(&self, locator: &Locator, path: &Path) {
        self.success(&format!("{locator} {}", format!("-> {}", path.display()).dark_grey()));
    }

    fn failed(&self, locator: &Locator, reason: &str) {
        self.status(&format!("{} {locator}: {reason}", "✗".red()));
    }

    fn copied(&self, id: &ModuleId, dest: &Path) {
        self.success(&format!("{id} {}", format!("-> {}", dest.display()).dark_grey()));
    }

    fn skipped(&self, id: &ModuleId) {
        self.info(&format!("{id} {}", "(already present)".dark_grey()));
    }

    fn warning(&self, msg: &str) {
        self.status(&format!("{} {msg}", "warning:".yellow()));
    }
}
