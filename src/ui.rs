//! Terminal rendering (termimad) and prompts (dialoguer).

use std::fmt::Display;
use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use termimad::MadSkin;
use termimad::crossterm::style::Stylize;
use termimad::crossterm::{cursor, execute, terminal};

use crate::github::PullRequest;
use crate::pager::Pager;
use crate::template;
use crate::triage::{Decision, TriageUi};

/// Markdown output on stdout.
pub struct Screen {
    skin: MadSkin,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    pub fn new() -> Self {
        Self {
            skin: MadSkin::default(),
        }
    }

    pub fn markdown(&self, text: &str) {
        self.skin.print_text(text);
    }

    pub fn line(&self, text: &str) {
        println!("{text}");
    }

    /// Emphasized single line, e.g. the search query being run.
    pub fn highlight(&self, text: &str) {
        println!("\n    {}\n", text.yellow().bold());
    }

    pub fn clear(&self) {
        let mut out = std::io::stdout();
        if let Err(e) = execute!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0)) {
            tracing::debug!("clearing screen failed: {e}");
        }
        let _ = out.flush();
    }
}

/// Color a unified diff for an ANSI-capable pager.
pub fn colorize_diff(diff: &str) -> String {
    let mut out = String::with_capacity(diff.len() + diff.len() / 4);
    for line in diff.lines() {
        let styled = if ["diff ", "index ", "+++", "---"]
            .iter()
            .any(|p| line.starts_with(p))
        {
            line.bold().to_string()
        } else if line.starts_with("@@") {
            line.cyan().to_string()
        } else if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else {
            line.to_string()
        };
        out.push_str(&styled);
        out.push('\n');
    }
    out
}

// --- Ctrl-C ---

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Route Ctrl-C to the prompts instead of killing the process.
///
/// The first press restores the cursor and marks the session interrupted;
/// the next prompt then reports cancellation. A second press exits with 130.
pub fn install_interrupt_handler() {
    let result = ctrlc::set_handler(|| {
        let mut err = std::io::stderr();
        let _ = write!(err, "\x1b[?25h");
        let _ = err.flush();
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            let _ = writeln!(err);
            std::process::exit(130);
        }
    });
    if let Err(e) = result {
        tracing::debug!(error = %e, "ctrl-c handler not installed");
    }
}

/// Whether Ctrl-C was pressed during this session.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Map a prompt result to `Ok(None)` when the operator cancelled it.
///
/// An interrupted read, or any failure after Ctrl-C was pressed, counts as
/// cancellation. Other failures are errors.
pub fn settle<T>(result: Result<Option<T>, dialoguer::Error>, what: &str) -> anyhow::Result<Option<T>> {
    settle_with(result, what, interrupted())
}

fn settle_with<T>(
    result: Result<Option<T>, dialoguer::Error>,
    what: &str,
    interrupted: bool,
) -> anyhow::Result<Option<T>> {
    match result {
        Ok(_) if interrupted => Ok(None),
        Ok(value) => Ok(value),
        Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::Interrupted || interrupted => {
            tracing::debug!("{what} cancelled: {e}");
            Ok(None)
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("reading {what}"))),
    }
}

// --- Interactive prompts using dialoguer ---
//
// Each returns `None` when the operator backs out with Esc or Ctrl-C.

pub fn prompt_select<T: Display>(prompt: &str, items: &[T]) -> anyhow::Result<Option<usize>> {
    if interrupted() {
        return Ok(None);
    }
    let result = dialoguer::Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt();
    settle(result, "user selection")
}

pub fn prompt_input(
    prompt: &str,
    validate: impl Fn(&str) -> Result<(), String>,
) -> anyhow::Result<Option<String>> {
    if interrupted() {
        return Ok(None);
    }
    let result = dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .validate_with(|s: &String| validate(s.as_str()))
        .interact_text()
        .map(Some);
    settle(result, "user input")
}

pub fn prompt_confirm(prompt: &str, default: bool) -> anyhow::Result<Option<bool>> {
    if interrupted() {
        return Ok(None);
    }
    let result = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact_opt();
    settle(result, "user confirmation")
}

/// Decision for a menu answer. Cancelled and failed prompts give `None`.
pub(crate) fn pick(menu: &[Decision], answer: anyhow::Result<Option<usize>>) -> Option<Decision> {
    match answer {
        Ok(Some(index)) => menu.get(index).copied(),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("selection failed: {e:#}");
            None
        }
    }
}

/// Interactive [`TriageUi`] backed by the terminal.
pub struct TerminalTriage<'a> {
    screen: &'a Screen,
    pager: Pager,
    menu: Vec<Decision>,
}

impl<'a> TerminalTriage<'a> {
    pub fn new(screen: &'a Screen, pager: Pager) -> Self {
        Self {
            screen,
            pager,
            menu: Decision::menu(),
        }
    }
}

impl TriageUi for TerminalTriage<'_> {
    fn present(&mut self, position: usize, total: usize, pr: &PullRequest) -> anyhow::Result<()> {
        self.screen.clear();
        self.screen.line(&format!("Card {position} of {total}..."));
        self.screen.markdown(&template::render_pr(pr)?);
        Ok(())
    }

    fn choose(&mut self, _pr: &PullRequest) -> Option<Decision> {
        pick(&self.menu, prompt_select("What would you like to do", &self.menu))
    }

    fn show_diff(&mut self, pr: &PullRequest, diff: &str) -> anyhow::Result<()> {
        tracing::debug!(pr = pr.number, pager = self.pager.program(), "showing diff");
        let colored = colorize_diff(diff);
        if !self.pager.page(&colored)? {
            print!("{colored}");
        }
        Ok(())
    }
}
